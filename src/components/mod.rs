pub mod photo_input;
pub mod result;
pub mod style_select;
pub mod upload;

pub use photo_input::PhotoInput;
pub use result::ResultScreen;
pub use style_select::StyleSelect;
pub use upload::UploadScreen;
