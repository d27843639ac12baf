use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template syntax error in {path}: {source}")]
    Syntax {
        path: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("template render error in {path}: {source}")]
    Render {
        path: String,
        #[source]
        source: minijinja::Error,
    },
}
