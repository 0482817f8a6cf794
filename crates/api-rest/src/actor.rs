//! Acting-user extraction.
//!
//! Authentication happens upstream; the authenticated identity arrives in three headers and is
//! trusted as given.

use crate::error::ApiError;
use axum::{extract::FromRequestParts, http::request::Parts};
use ward_core::{Actor, ActorRole};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The [`Actor`] making the current request.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

fn required_header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::bad_request(format!("missing or invalid {} header", name)))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = required_header(parts, ACTOR_ID_HEADER)?;
        let name = required_header(parts, ACTOR_NAME_HEADER)?;
        let role: ActorRole = required_header(parts, ACTOR_ROLE_HEADER)?.parse()?;
        Ok(RequestActor(Actor::new(id, name, role)?))
    }
}
