#[rocket::launch]
fn rocket() -> _ {
    watchlist_api::rocket()
}
