use bytes::Bytes;
use tempfile::TempDir;

use wellhub::auth::{credentials, ConsultantIdentity, IdentityContext};
use wellhub::db;
use wellhub::state::DbPool;
use wellhub::error::AppError;
use wellhub::media::{MediaStore, Upload};
use wellhub::social::{self, ConsultantDetails, FeedQuery, PostDraft};

struct Fixture {
    _dir: TempDir,
    pool: DbPool,
    media: MediaStore,
}

fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("test.db")).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    let media = MediaStore::open(dir.path().join("uploads")).unwrap();
    Fixture {
        _dir: dir,
        pool,
        media,
    }
}

fn consultant_context(id: i64, email: &str) -> IdentityContext {
    IdentityContext {
        user: None,
        consultant: Some(ConsultantIdentity {
            id,
            email: email.to_string(),
        }),
    }
}

fn details(name: &str, email: &str, specialization: &str) -> ConsultantDetails {
    ConsultantDetails {
        name: name.to_string(),
        email: email.to_string(),
        specialization: specialization.to_string(),
        bio: None,
    }
}

fn query(specialization: &str) -> FeedQuery {
    FeedQuery {
        search: None,
        specialization: Some(specialization.to_string()),
    }
}

#[test]
fn like_comment_and_filter_scenario() {
    let fx = setup();
    let mut conn = fx.pool.get().unwrap();

    let consultant = social::consultants::register_consultant(
        &conn,
        &fx.media,
        &details("Nina", "nina@example.com", "Nutrition"),
        None,
    )
    .unwrap();
    let post = social::posts::create_post(
        &conn,
        &fx.media,
        &consultant_context(consultant.id, &consultant.email),
        PostDraft {
            content: "Eat more fiber".into(),
            media: None,
        },
    )
    .unwrap();

    let user = credentials::register(&conn, "user@example.com", "secret", 4).unwrap();
    let actor = Some(user.id);

    let state = social::relations::toggle_like(&mut conn, post.id, actor).unwrap();
    assert!(state.liked);
    assert_eq!(social::relations::like_count(&conn, post.id).unwrap(), 1);

    let state = social::relations::toggle_like(&mut conn, post.id, actor).unwrap();
    assert!(!state.liked);
    assert_eq!(social::relations::like_count(&conn, post.id).unwrap(), 0);

    social::relations::add_comment(&conn, post.id, actor, "Great tip!")
        .unwrap()
        .expect("comment stored");
    let bodies: Vec<String> = social::relations::comments_for_post(&conn, post.id)
        .unwrap()
        .into_iter()
        .map(|c| c.body)
        .collect();
    assert_eq!(bodies, vec!["Great tip!"]);

    let nutri = social::feed::list_feed(&conn, &query("nutri")).unwrap();
    assert_eq!(nutri.len(), 1);
    assert_eq!(nutri[0].post.id, post.id);
    assert_eq!(nutri[0].comments.len(), 1);

    assert!(social::feed::list_feed(&conn, &query("cardio"))
        .unwrap()
        .is_empty());
}

#[test]
fn only_the_owner_may_edit_or_delete() {
    let fx = setup();
    let conn = fx.pool.get().unwrap();

    let owner = social::consultants::register_consultant(
        &conn,
        &fx.media,
        &details("Nina", "nina@example.com", "Nutrition"),
        None,
    )
    .unwrap();
    let other = social::consultants::register_consultant(
        &conn,
        &fx.media,
        &details("Carl", "carl@example.com", "Cardiology"),
        None,
    )
    .unwrap();

    let post = social::posts::create_post(
        &conn,
        &fx.media,
        &consultant_context(owner.id, &owner.email),
        PostDraft {
            content: "Original".into(),
            media: None,
        },
    )
    .unwrap();

    let intruder = consultant_context(other.id, &other.email);
    let edit = social::posts::edit_post(
        &conn,
        &fx.media,
        &intruder,
        post.id,
        PostDraft {
            content: "Hijacked".into(),
            media: None,
        },
    );
    assert!(matches!(edit, Err(AppError::Forbidden)));
    assert!(matches!(
        social::posts::delete_post(&conn, &fx.media, &intruder, post.id),
        Err(AppError::Forbidden)
    ));

    let unchanged = social::posts::find_post(&conn, post.id).unwrap().unwrap();
    assert_eq!(unchanged.content, "Original");
}

#[test]
fn deleting_a_post_releases_media_and_cascades() {
    let fx = setup();
    let mut conn = fx.pool.get().unwrap();

    let consultant = social::consultants::register_consultant(
        &conn,
        &fx.media,
        &details("Vera", "vera@example.com", "Physiotherapy"),
        None,
    )
    .unwrap();
    let identity = consultant_context(consultant.id, &consultant.email);

    let post = social::posts::create_post(
        &conn,
        &fx.media,
        &identity,
        PostDraft {
            content: "Stretch routine".into(),
            media: Some(Upload {
                file_name: "routine.MP4".into(),
                content_type: Some("video/mp4".into()),
                data: Bytes::from_static(b"fake video"),
            }),
        },
    )
    .unwrap();
    let reference = post.media_path.clone().expect("media stored");
    assert!(reference.ends_with(".mp4"));
    assert!(fx.media.exists(&reference));

    social::relations::toggle_like(&mut conn, post.id, None).unwrap();
    social::relations::add_comment(&conn, post.id, None, "Thanks").unwrap();

    social::posts::delete_post(&conn, &fx.media, &identity, post.id).unwrap();

    assert!(!fx.media.exists(&reference));
    assert!(social::posts::find_post(&conn, post.id).unwrap().is_none());
    assert_eq!(social::relations::like_count(&conn, post.id).unwrap(), 0);
    assert!(social::relations::comments_for_post(&conn, post.id)
        .unwrap()
        .is_empty());
}

#[test]
fn anonymous_actor_shares_one_follow_slot() {
    let fx = setup();
    let mut conn = fx.pool.get().unwrap();

    let consultant = social::consultants::register_consultant(
        &conn,
        &fx.media,
        &details("Nina", "nina@example.com", "Nutrition"),
        None,
    )
    .unwrap();
    let user = credentials::register(&conn, "u@example.com", "pw", 4).unwrap();

    assert!(social::relations::toggle_follow(&mut conn, consultant.id, None).unwrap().following);
    assert!(social::relations::toggle_follow(&mut conn, consultant.id, Some(user.id)).unwrap().following);
    assert_eq!(social::relations::follower_count(&conn, consultant.id).unwrap(), 2);

    assert!(!social::relations::toggle_follow(&mut conn, consultant.id, None).unwrap().following);
    assert_eq!(social::relations::follower_count(&conn, consultant.id).unwrap(), 1);

    let profile = social::consultants::consultant_profile(&conn, consultant.id).unwrap();
    assert_eq!(profile.follower_count, 1);
}
