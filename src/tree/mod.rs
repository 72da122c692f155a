pub(crate) mod node;
pub(crate) mod render_tree;
