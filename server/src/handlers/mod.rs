pub mod links;
pub mod redirect;

/// GET /
pub async fn index() -> &'static str {
    "Dynamic Link Server is running!"
}
