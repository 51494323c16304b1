use std::collections::BTreeMap;
use utoipa::{
    openapi::{RefOr, Response, ResponseBuilder, ResponsesBuilder},
    IntoResponses,
};

/// Responses every authenticated operation may return.
pub enum AuthResponse {
    NotAuthenticated,
}

impl IntoResponses for AuthResponse {
    fn responses() -> BTreeMap<String, RefOr<Response>> {
        ResponsesBuilder::new()
            .response(
                "401",
                ResponseBuilder::new()
                    .description("The user did not provide valid authentication credentials"),
            )
            .build()
            .into()
    }
}
