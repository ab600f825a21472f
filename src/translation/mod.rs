//! Translation service collaborator

mod gateway;
mod http;

pub use gateway::{Translation, TranslationGateway};
pub use http::{HttpTranslationGateway, TranslateRequest};
