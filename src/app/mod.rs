mod root;
pub mod view;

pub use root::App;
