mod json;
mod scope;

pub use json::ValidatedJson;
pub use scope::{
    EnsureDemoSession, MemberScope, RequireDemoSession, ScopeSource, session_id_from_query,
};
