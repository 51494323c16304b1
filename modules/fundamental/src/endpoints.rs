use magna_common::db::Database;

/// Mount all endpoints of this module.
pub fn configure(svc: &mut utoipa_actix_web::service_config::ServiceConfig, db: Database) {
    crate::user::endpoints::configure(svc, db.clone());
    crate::friend::endpoints::configure(svc, db.clone());
    crate::chat::endpoints::configure(svc, db);
}
