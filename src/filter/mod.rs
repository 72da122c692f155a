pub(crate) mod color_filter;
pub(crate) mod registry;
