use sea_orm::{EntityTrait, ModelTrait};
use yatube::entity::post;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn deleted_post_stays_on_index_until_cache_is_cleared() {
    let app = TestApp::spawn().await;
    let (leo, _) = app.create_user("leo").await;
    let post = app.create_post(leo.id, "Soon gone", None).await;

    let first = app.get(routes::INDEX, None).await;
    assert_eq!(first.post_ids(), vec![post.id as i64]);

    post.delete(&app.db).await.unwrap();
    assert!(post::Entity::find().one(&app.db).await.unwrap().is_none());

    let cached = app.get(routes::INDEX, None).await;
    assert_eq!(cached.status, 200);
    assert_eq!(cached.text, first.text);

    app.state.page_cache.clear();

    let fresh = app.get(routes::INDEX, None).await;
    assert!(fresh.posts().is_empty());
}

#[tokio::test]
async fn html_page_is_cached_too() {
    let app = TestApp::spawn().await;
    let (leo, _) = app.create_user("leo").await;
    let post = app.create_post(leo.id, "Cached markup", None).await;

    let first = app.get_html(routes::INDEX, None).await;
    assert!(first.text.contains("Cached markup"));

    post.delete(&app.db).await.unwrap();

    let cached = app.get_html(routes::INDEX, None).await;
    assert!(cached.text.contains("Cached markup"));
    assert!(
        cached
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("text/html"))
    );
}

#[tokio::test]
async fn other_pages_are_not_cached() {
    let app = TestApp::spawn().await;
    let (leo, _) = app.create_user("leo").await;
    let post = app.create_post(leo.id, "Profile post", None).await;

    let before = app.get(&routes::profile("leo"), None).await;
    assert_eq!(before.posts().len(), 1);

    post.delete(&app.db).await.unwrap();

    let after = app.get(&routes::profile("leo"), None).await;
    assert!(after.posts().is_empty());
}

#[tokio::test]
async fn each_page_number_is_cached_separately() {
    let app = TestApp::spawn().await;
    let (leo, _) = app.create_user("leo").await;
    for i in 0..11 {
        app.create_post(leo.id, &format!("Post {i}"), None).await;
    }

    let first = app.get("/?page=1", None).await;
    let second = app.get("/?page=2", None).await;

    assert_eq!(first.posts().len(), 10);
    assert_eq!(second.posts().len(), 1);
    assert_eq!(app.state.page_cache.len(), 2);
}
