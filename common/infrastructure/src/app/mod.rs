pub mod http;

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::{Compress, Condition, Logger},
    App, Error,
};
use actix_web_httpauth::{extractors::bearer::BearerAuth, middleware::HttpAuthentication};
use futures::{future::LocalBoxFuture, FutureExt};
use magna_auth::authenticator::Authenticator;
use std::sync::Arc;

#[derive(Default)]
pub struct AppOptions {
    pub cors: Option<Cors>,
    pub logger: Option<Logger>,
}

/// Create the authentication middleware, requiring a valid bearer token.
#[allow(clippy::type_complexity)]
pub fn new_auth(
    authenticator: Arc<Authenticator>,
) -> HttpAuthentication<
    BearerAuth,
    impl Fn(
        ServiceRequest,
        BearerAuth,
    ) -> LocalBoxFuture<'static, Result<ServiceRequest, (Error, ServiceRequest)>>,
> {
    HttpAuthentication::bearer(move |req, auth| {
        let authenticator = authenticator.clone();
        async move {
            magna_auth::authenticator::actix::bearer_validator(req, auth, authenticator).await
        }
        .boxed_local()
    })
}

/// Build a new HTTP app in a consistent way.
///
/// Adding middleware to an HTTP app is tricky, as it requires to think about the order of adding.
/// This function should capture all the logic requires to properly set up a common application,
/// allowing some choices in the process.
pub fn new_app(
    options: AppOptions,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    // The order of execution is last added becomes first to be executed. So if you read the
    // following lines, read them from end to start!
    let cors = options.cors.is_some();
    let logger = options.logger.is_some();

    App::new()
        // Handle CORS requests, this might finish early and not pass requests to the next entry
        .wrap(Condition::new(cors, options.cors.unwrap_or_default()))
        // Compress everything
        .wrap(Compress::default())
        // First log the request, so that we know what happens (can't fail)
        .wrap(Condition::new(
            logger,
            options.logger.unwrap_or_default(),
        ))
}
