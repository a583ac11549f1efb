pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("device doesn't support ray tracing")]
    RayTracingUnsupported,

    #[error(
        "missing inputs: neither the complex bundle ({complex}) nor the \
         simplified bundle ({simplified}) is fully bound"
    )]
    MissingInputs { complex: String, simplified: String },

    #[error("missing required output: {0}")]
    MissingOutput(&'static str),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("couldn't compile kernel `{entry_point}`: {reason}")]
    Compilation { entry_point: String, reason: String },

    #[error("kernel `{entry_point}` expects binding `{name}`, which is missing")]
    UnknownBinding {
        entry_point: String,
        name: &'static str,
    },

    #[error("device error: {0}")]
    Device(String),
}

impl Error {
    pub fn device(msg: impl ToString) -> Self {
        Error::Device(msg.to_string())
    }

    pub fn configuration(msg: impl ToString) -> Self {
        Error::Configuration(msg.to_string())
    }
}
