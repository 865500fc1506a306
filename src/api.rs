use rocket::Route;

mod answer_boards;
mod auth;
mod common;
mod question_boards;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(question_boards::routes());
    routes.extend(answer_boards::routes());
    routes
}
