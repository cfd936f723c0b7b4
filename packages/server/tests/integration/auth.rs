use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use yatube::entity::user;

use crate::common::{TestApp, TestResponse, routes};

async fn signup(app: &TestApp, username: &str, password: &str) -> TestResponse {
    app.post_form(
        routes::SIGNUP,
        &[
            ("first_name", "Leo"),
            ("last_name", "Tolstoy"),
            ("username", username),
            ("email", "leo@yasnaya.example"),
            ("password1", password),
            ("password2", password),
        ],
        None,
    )
    .await
}

mod signup {
    use super::*;

    #[tokio::test]
    async fn new_user_is_created_and_logged_in() {
        let app = TestApp::spawn().await;

        let res = signup(&app, "leo", "war&peace1869").await;

        res.assert_redirect("/");
        let saved = user::Entity::find()
            .filter(user::Column::Username.eq("leo"))
            .one(&app.db)
            .await
            .unwrap()
            .expect("user was not created");
        assert_eq!(saved.full_name(), "Leo Tolstoy");
        assert_eq!(saved.email, "leo@yasnaya.example");
        assert_ne!(saved.password, "war&peace1869");

        // The session cookie now identifies the user.
        let page = app.get(routes::CREATE, None).await;
        assert_eq!(page.status, 200);
        assert_eq!(page.body["viewer"]["username"], "leo");
    }

    #[tokio::test]
    async fn taken_username_is_reported_on_the_form() {
        let app = TestApp::spawn().await;
        app.create_user("leo").await;

        let res = signup(&app, "leo", "war&peace1869").await;

        assert_eq!(res.status, 200);
        assert_eq!(res.template(), "users/signup.html");
        assert_eq!(
            res.body["form"]["errors"]["username"][0],
            "A user with that username already exists."
        );
        assert_eq!(res.body["form"]["username"], "leo");
        assert_eq!(app.count::<user::Entity>().await, 1);
    }

    #[tokio::test]
    async fn invalid_form_is_redisplayed_without_passwords() {
        let app = TestApp::spawn().await;

        let res = app
            .post_form(
                routes::SIGNUP,
                &[
                    ("username", "no spaces"),
                    ("password1", "short"),
                    ("password2", "other"),
                ],
                None,
            )
            .await;

        assert_eq!(res.status, 200);
        let errors = &res.body["form"]["errors"];
        assert!(errors["username"].is_array());
        assert!(errors["password1"].is_array());
        assert!(errors["password2"].is_array());
        assert!(res.body["form"].get("password1").is_none());
        assert_eq!(app.count::<user::Entity>().await, 0);
    }

    #[tokio::test]
    async fn signup_page_uses_its_template() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::SIGNUP, None).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.template(), "users/signup.html");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn valid_credentials_redirect_to_next() {
        let app = TestApp::spawn().await;
        signup(&app, "leo", "war&peace1869").await;
        app.post_form(routes::LOGOUT, &[], None).await;

        let res = app
            .post_form(
                "/auth/login/?next=/create/",
                &[("username", "leo"), ("password", "war&peace1869")],
                None,
            )
            .await;

        res.assert_redirect("/create/");
        assert_eq!(app.get(routes::CREATE, None).await.status, 200);
    }

    #[tokio::test]
    async fn foreign_next_is_ignored() {
        let app = TestApp::spawn().await;
        signup(&app, "leo", "war&peace1869").await;

        let res = app
            .post_form(
                "/auth/login/?next=//evil.example/",
                &[("username", "leo"), ("password", "war&peace1869")],
                None,
            )
            .await;

        res.assert_redirect("/");
    }

    #[tokio::test]
    async fn wrong_password_redisplays_the_form() {
        let app = TestApp::spawn().await;
        signup(&app, "leo", "war&peace1869").await;
        app.post_form(routes::LOGOUT, &[], None).await;

        let res = app
            .post_form(
                routes::LOGIN,
                &[("username", "leo"), ("password", "anna&karenina")],
                None,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.template(), "users/login.html");
        assert!(
            res.body["form"]["errors"]["__all__"][0]
                .as_str()
                .unwrap()
                .starts_with("Please enter a correct username and password")
        );
        assert_eq!(res.body["form"]["username"], "leo");
        app.get(routes::CREATE, None)
            .await
            .assert_redirect(&routes::login_redirect("/create/"));
    }

    #[tokio::test]
    async fn unknown_user_cannot_log_in() {
        let app = TestApp::spawn().await;

        let res = app
            .post_form(
                routes::LOGIN,
                &[("username", "ghost"), ("password", "whatever123")],
                None,
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["form"]["errors"]["__all__"].is_array());
    }

    #[tokio::test]
    async fn account_without_usable_password_cannot_log_in() {
        let app = TestApp::spawn().await;
        app.create_user("leo").await;

        let res = app
            .post_form(routes::LOGIN, &[("username", "leo"), ("password", "!")], None)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["form"]["errors"]["__all__"].is_array());
    }

    #[tokio::test]
    async fn login_page_keeps_next() {
        let app = TestApp::spawn().await;

        let res = app.get("/auth/login/?next=/follow/", None).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.template(), "users/login.html");
        assert_eq!(res.body["next"], "/follow/");
    }

    #[tokio::test]
    async fn invalid_bearer_token_counts_as_anonymous() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::CREATE, Some("not-a-token")).await;

        res.assert_redirect(&routes::login_redirect("/create/"));
    }
}

mod logout {
    use super::*;

    #[tokio::test]
    async fn logout_ends_the_session() {
        let app = TestApp::spawn().await;
        signup(&app, "leo", "war&peace1869").await;
        assert_eq!(app.get(routes::CREATE, None).await.status, 200);

        let res = app.post_form(routes::LOGOUT, &[], None).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.template(), "users/logged_out.html");
        assert!(res.body["viewer"].is_null());
        app.get(routes::CREATE, None)
            .await
            .assert_redirect(&routes::login_redirect("/create/"));
    }
}

