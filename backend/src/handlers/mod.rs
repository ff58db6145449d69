use actix_web::web;

pub mod auth;
pub mod expenses;
pub mod members;
pub mod mess_groups;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(auth::configure)
            .configure(mess_groups::configure)
            .configure(members::configure)
            .configure(expenses::configure),
    );
}
