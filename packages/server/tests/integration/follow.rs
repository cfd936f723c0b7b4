use yatube::entity::follow;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn follow_then_unfollow_restores_the_relation_count() {
    let app = TestApp::spawn().await;
    app.create_user("leo").await;
    let (_, reader_token) = app.create_user("reader").await;
    let before = app.count::<follow::Entity>().await;

    app.get(&routes::follow("leo"), Some(&reader_token))
        .await
        .assert_redirect(routes::FOLLOW_INDEX);
    assert_eq!(app.count::<follow::Entity>().await, before + 1);

    app.get(&routes::unfollow("leo"), Some(&reader_token))
        .await
        .assert_redirect(routes::FOLLOW_INDEX);
    assert_eq!(app.count::<follow::Entity>().await, before);
}

#[tokio::test]
async fn following_twice_creates_one_relation() {
    let app = TestApp::spawn().await;
    app.create_user("leo").await;
    let (_, reader_token) = app.create_user("reader").await;

    app.get(&routes::follow("leo"), Some(&reader_token)).await;
    app.post_form(&routes::follow("leo"), &[], Some(&reader_token))
        .await
        .assert_redirect(routes::FOLLOW_INDEX);

    assert_eq!(app.count::<follow::Entity>().await, 1);
}

#[tokio::test]
async fn following_yourself_creates_nothing() {
    let app = TestApp::spawn().await;
    let (_, token) = app.create_user("leo").await;

    app.get(&routes::follow("leo"), Some(&token))
        .await
        .assert_redirect(routes::FOLLOW_INDEX);

    assert_eq!(app.count::<follow::Entity>().await, 0);
}

#[tokio::test]
async fn unknown_author_and_missing_relation_are_not_found() {
    let app = TestApp::spawn().await;
    app.create_user("leo").await;
    let (_, reader_token) = app.create_user("reader").await;

    let res = app.get(&routes::follow("nobody"), Some(&reader_token)).await;
    assert_eq!(res.status, 404);

    let res = app.get(&routes::unfollow("leo"), Some(&reader_token)).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn profile_reports_whether_the_viewer_follows() {
    let app = TestApp::spawn().await;
    app.create_user("leo").await;
    let (_, reader_token) = app.create_user("reader").await;

    let res = app.get(&routes::profile("leo"), Some(&reader_token)).await;
    assert_eq!(res.body["following"], false);

    app.get(&routes::follow("leo"), Some(&reader_token)).await;

    let res = app.get(&routes::profile("leo"), Some(&reader_token)).await;
    assert_eq!(res.body["following"], true);
}

#[tokio::test]
async fn feed_shows_posts_of_followed_authors_only() {
    let app = TestApp::spawn().await;
    let (leo, _) = app.create_user("leo").await;
    let (anna, _) = app.create_user("anna").await;
    let (_, reader_token) = app.create_user("reader").await;
    let (_, stranger_token) = app.create_user("stranger").await;
    let leo_post = app.create_post(leo.id, "Followed", None).await;
    app.create_post(anna.id, "Not followed", None).await;

    app.get(&routes::follow("leo"), Some(&reader_token)).await;

    let feed = app.get(routes::FOLLOW_INDEX, Some(&reader_token)).await;
    assert_eq!(feed.status, 200);
    assert_eq!(feed.template(), "posts/follow.html");
    assert_eq!(feed.post_ids(), vec![leo_post.id as i64]);

    let other_feed = app.get(routes::FOLLOW_INDEX, Some(&stranger_token)).await;
    assert_eq!(other_feed.status, 200);
    assert!(other_feed.posts().is_empty());
}

#[tokio::test]
async fn new_post_reaches_followers_feed() {
    let app = TestApp::spawn().await;
    let (leo, _) = app.create_user("leo").await;
    let (_, reader_token) = app.create_user("reader").await;
    app.get(&routes::follow("leo"), Some(&reader_token)).await;

    let post = app.create_post(leo.id, "Fresh", None).await;

    let feed = app.get(routes::FOLLOW_INDEX, Some(&reader_token)).await;
    assert_eq!(feed.post_ids(), vec![post.id as i64]);
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login() {
    let app = TestApp::spawn().await;
    app.create_user("leo").await;

    app.get(routes::FOLLOW_INDEX, None)
        .await
        .assert_redirect(&routes::login_redirect("/follow/"));
    app.get(&routes::follow("leo"), None)
        .await
        .assert_redirect(&routes::login_redirect("/profile/leo/follow/"));
    app.get(&routes::unfollow("leo"), None)
        .await
        .assert_redirect(&routes::login_redirect("/profile/leo/unfollow/"));
    assert_eq!(app.count::<follow::Entity>().await, 0);
}
