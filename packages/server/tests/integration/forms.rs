use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use yatube::entity::{comment, post};

use crate::common::{SMALL_GIF, TestApp, post_form, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn valid_post_is_saved_for_the_author_and_redirects_to_profile() {
        let app = TestApp::spawn().await;
        let (leo, token) = app.create_user("leo").await;
        let group = app.create_group("Cats", "cats").await;
        let before = app.count::<post::Entity>().await;

        let form = post_form("Brand new post", Some(group.id), None);
        let res = app.post_multipart(routes::CREATE, form, Some(&token)).await;

        res.assert_redirect(&routes::profile("leo"));
        assert_eq!(app.count::<post::Entity>().await, before + 1);
        let saved = post::Entity::find()
            .filter(post::Column::Text.eq("Brand new post"))
            .one(&app.db)
            .await
            .unwrap()
            .expect("post was not saved");
        assert_eq!(saved.author_id, leo.id);
        assert_eq!(saved.group_id, Some(group.id));
        assert!(saved.image.is_none());
    }

    #[tokio::test]
    async fn uploaded_image_is_stored_under_posts() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("leo").await;

        let form = post_form("With a picture", None, Some(("small.gif", "image/gif", SMALL_GIF)));
        let res = app.post_multipart(routes::CREATE, form, Some(&token)).await;

        res.assert_redirect(&routes::profile("leo"));
        let saved = post::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert_eq!(saved.image.as_deref(), Some("posts/small.gif"));
        assert!(app.media_root.join("posts/small.gif").exists());

        let listing = app.get(routes::INDEX, None).await;
        assert_eq!(listing.posts()[0]["image_url"], "/media/posts/small.gif");
        let served = app.get("/media/posts/small.gif", None).await;
        assert_eq!(served.status, 200);
    }

    #[tokio::test]
    async fn urlencoded_submission_is_accepted() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("leo").await;

        let res = app
            .post_form(routes::CREATE, &[("text", "Plain form"), ("group", "")], Some(&token))
            .await;

        res.assert_redirect(&routes::profile("leo"));
        assert_eq!(app.count::<post::Entity>().await, 1);
    }

    #[tokio::test]
    async fn blank_text_redisplays_the_form_and_saves_nothing() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("leo").await;

        let res = app
            .post_multipart(routes::CREATE, post_form("   ", None, None), Some(&token))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.template(), "posts/create_post.html");
        assert_eq!(res.body["form"]["errors"]["text"][0], "This field is required.");
        assert_eq!(res.body["is_edit"], false);
        assert_eq!(app.count::<post::Entity>().await, 0);
    }

    #[tokio::test]
    async fn unknown_group_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("leo").await;

        let res = app
            .post_multipart(routes::CREATE, post_form("Text", Some(999), None), Some(&token))
            .await;

        assert_eq!(res.status, 200);
        assert!(
            res.body["form"]["errors"]["group"][0]
                .as_str()
                .unwrap()
                .starts_with("Select a valid choice")
        );
        assert_eq!(res.body["form"]["text"], "Text");
        assert_eq!(app.count::<post::Entity>().await, 0);
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("leo").await;

        let form = post_form("Text", None, Some(("notes.txt", "text/plain", b"hello")));
        let res = app.post_multipart(routes::CREATE, form, Some(&token)).await;

        assert_eq!(res.status, 200);
        assert!(res.body["form"]["errors"]["image"].is_array());
        assert_eq!(app.count::<post::Entity>().await, 0);
        assert!(!app.media_root.join("posts/notes.txt").exists());
    }

    #[tokio::test]
    async fn create_form_lists_groups() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("leo").await;
        app.create_group("Dogs", "dogs").await;
        app.create_group("Cats", "cats").await;

        let res = app.get(routes::CREATE, Some(&token)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.template(), "posts/create_post.html");
        let titles: Vec<&str> = res.body["form"]["groups"]
            .as_array()
            .unwrap()
            .iter()
            .map(|g| g["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Cats", "Dogs"]);
    }

    #[tokio::test]
    async fn anonymous_user_is_sent_to_login() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::CREATE, None).await;
        res.assert_redirect(&routes::login_redirect("/create/"));

        let res = app
            .post_multipart(routes::CREATE, post_form("Sneaky", None, None), None)
            .await;
        res.assert_redirect(&routes::login_redirect("/create/"));
        assert_eq!(app.count::<post::Entity>().await, 0);
    }
}

mod edit {
    use super::*;

    #[tokio::test]
    async fn author_can_edit_and_is_redirected_to_detail() {
        let app = TestApp::spawn().await;
        let (leo, token) = app.create_user("leo").await;
        let group = app.create_group("Cats", "cats").await;
        let post = app.create_post(leo.id, "Original", None).await;

        let form_page = app.get(&routes::post_edit(post.id), Some(&token)).await;
        assert_eq!(form_page.status, 200);
        assert_eq!(form_page.body["is_edit"], true);
        assert_eq!(form_page.body["form"]["text"], "Original");
        assert_eq!(form_page.body["post"]["id"], post.id);

        let res = app
            .post_multipart(
                &routes::post_edit(post.id),
                post_form("Edited", Some(group.id), None),
                Some(&token),
            )
            .await;

        res.assert_redirect(&routes::post_detail(post.id));
        let edited = app.find_post(post.id).await;
        assert_eq!(edited.text, "Edited");
        assert_eq!(edited.group_id, Some(group.id));
        assert_eq!(edited.author_id, leo.id);
        assert_eq!(app.count::<post::Entity>().await, 1);
    }

    #[tokio::test]
    async fn non_author_is_redirected_and_post_is_unchanged() {
        let app = TestApp::spawn().await;
        let (leo, _) = app.create_user("leo").await;
        let (_, anna_token) = app.create_user("anna").await;
        let post = app.create_post(leo.id, "Leo's words", None).await;

        let res = app.get(&routes::post_edit(post.id), Some(&anna_token)).await;
        res.assert_redirect(&routes::post_detail(post.id));

        let res = app
            .post_multipart(
                &routes::post_edit(post.id),
                post_form("Anna's words", None, None),
                Some(&anna_token),
            )
            .await;
        res.assert_redirect(&routes::post_detail(post.id));
        assert_eq!(app.find_post(post.id).await.text, "Leo's words");
    }

    #[tokio::test]
    async fn anonymous_edit_is_sent_to_login() {
        let app = TestApp::spawn().await;
        let (leo, _) = app.create_user("leo").await;
        let post = app.create_post(leo.id, "Original", None).await;
        let path = routes::post_edit(post.id);

        app.get(&path, None)
            .await
            .assert_redirect(&routes::login_redirect(&path));
        app.post_multipart(&path, post_form("Changed", None, None), None)
            .await
            .assert_redirect(&routes::login_redirect(&path));
        assert_eq!(app.find_post(post.id).await.text, "Original");
    }

    #[tokio::test]
    async fn editing_unknown_post_is_not_found() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("leo").await;

        let res = app.get(&routes::post_edit(404), Some(&token)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn image_is_kept_unless_cleared() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("leo").await;
        let form = post_form("Picture", None, Some(("small.gif", "image/gif", SMALL_GIF)));
        app.post_multipart(routes::CREATE, form, Some(&token)).await;
        let post = post::Entity::find().one(&app.db).await.unwrap().unwrap();
        let path = routes::post_edit(post.id);

        app.post_multipart(&path, post_form("New text", None, None), Some(&token))
            .await
            .assert_redirect(&routes::post_detail(post.id));
        assert_eq!(
            app.find_post(post.id).await.image.as_deref(),
            Some("posts/small.gif")
        );

        app.post_form(&path, &[("text", "No picture"), ("clear_image", "on")], Some(&token))
            .await
            .assert_redirect(&routes::post_detail(post.id));
        let cleared = app.find_post(post.id).await;
        assert_eq!(cleared.text, "No picture");
        assert!(cleared.image.is_none());
    }

    #[tokio::test]
    async fn invalid_edit_keeps_the_post() {
        let app = TestApp::spawn().await;
        let (leo, token) = app.create_user("leo").await;
        let post = app.create_post(leo.id, "Original", None).await;

        let res = app
            .post_multipart(&routes::post_edit(post.id), post_form("", None, None), Some(&token))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["is_edit"], true);
        assert!(res.body["form"]["errors"]["text"].is_array());
        assert_eq!(app.find_post(post.id).await.text, "Original");
    }
}

mod comments {
    use super::*;

    #[tokio::test]
    async fn comment_appears_on_the_post_page() {
        let app = TestApp::spawn().await;
        let (leo, _) = app.create_user("leo").await;
        let (anna, anna_token) = app.create_user("anna").await;
        let post = app.create_post(leo.id, "Discuss", None).await;

        let res = app
            .post_form(&routes::add_comment(post.id), &[("text", "Nice post")], Some(&anna_token))
            .await;

        res.assert_redirect(&routes::post_detail(post.id));
        let saved = comment::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert_eq!(saved.author_id, anna.id);
        assert_eq!(saved.post_id, Some(post.id));

        let detail = app.get(&routes::post_detail(post.id), None).await;
        let comments = detail.body["comments"].as_array().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["text"], "Nice post");
        assert_eq!(comments[0]["author"]["username"], "anna");
    }

    #[tokio::test]
    async fn newest_comment_is_listed_first() {
        let app = TestApp::spawn().await;
        let (leo, token) = app.create_user("leo").await;
        let post = app.create_post(leo.id, "Discuss", None).await;
        let path = routes::add_comment(post.id);

        app.post_form(&path, &[("text", "first")], Some(&token)).await;
        app.post_form(&path, &[("text", "second")], Some(&token)).await;

        let detail = app.get(&routes::post_detail(post.id), None).await;
        assert_eq!(detail.body["comments"][0]["text"], "second");
        assert_eq!(detail.body["comments"][1]["text"], "first");
    }

    #[tokio::test]
    async fn blank_comment_is_dropped_silently() {
        let app = TestApp::spawn().await;
        let (leo, token) = app.create_user("leo").await;
        let post = app.create_post(leo.id, "Discuss", None).await;

        let res = app
            .post_form(&routes::add_comment(post.id), &[("text", "  ")], Some(&token))
            .await;

        res.assert_redirect(&routes::post_detail(post.id));
        assert_eq!(app.count::<comment::Entity>().await, 0);
    }

    #[tokio::test]
    async fn anonymous_comment_is_sent_to_login() {
        let app = TestApp::spawn().await;
        let (leo, _) = app.create_user("leo").await;
        let post = app.create_post(leo.id, "Discuss", None).await;
        let path = routes::add_comment(post.id);

        let res = app.post_form(&path, &[("text", "Hi")], None).await;

        res.assert_redirect(&routes::login_redirect(&path));
        assert_eq!(app.count::<comment::Entity>().await, 0);
    }

    #[tokio::test]
    async fn comment_on_unknown_post_is_not_found() {
        let app = TestApp::spawn().await;
        let (_, token) = app.create_user("leo").await;

        let res = app
            .post_form(&routes::add_comment(999), &[("text", "Hi")], Some(&token))
            .await;

        assert_eq!(res.status, 404);
    }
}
