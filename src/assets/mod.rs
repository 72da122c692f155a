pub(crate) mod decode;
pub(crate) mod delegate;
pub(crate) mod fonts;
pub(crate) mod store;
