use actix_web::web::ServiceConfig;

mod admin;
mod login;
mod maintenance;
mod organiser;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(login::admin_login)
        .service(login::admin_login_federated)
        .service(login::login)
        .service(login::login_federated)
        .service(login::student_signup)
        .service(login::student_signup_federated)
        .service(login::student_login)
        .service(login::logout)
        .service(admin::get_tenants)
        .service(admin::create_tenant)
        .service(admin::refresh)
        .service(admin::get_rent)
        .service(admin::open_month)
        .service(admin::get_rent_detail)
        .service(admin::mark_paid)
        .service(organiser::get_events)
        .service(organiser::get_profile)
        .service(maintenance::raise_complaint)
        .service(maintenance::get_complaint)
        .service(maintenance::ws_index);
}
