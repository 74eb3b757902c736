use strum::{Display, EnumString};

/// JSON-schema primitive types a tool argument can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub(crate) enum JsonType {
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "integer")]
    Integer,
    #[strum(serialize = "number")]
    Number,
    #[strum(serialize = "boolean")]
    Boolean,
    #[strum(serialize = "array")]
    Array,
}
