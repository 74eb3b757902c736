mod url;

pub use url::create_model_url;
