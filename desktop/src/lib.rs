pub mod batch;
pub mod image_utils;
