use chrono::{TimeZone, Utc};
use scribe::models::{CreatePost, NewContactMessage, PostStatus, UpdatePost};
use scribe::services::forms::CommentForm;
use scribe::services::{comments, contact, images, posts, search, tags, BlogError};
use scribe::Database;

fn create_test_db() -> Database {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let id: u32 = rng.gen();
    let name = format!("test_db_{}", id);

    let db = Database::open_memory(&name).expect("Failed to create test database");
    db.migrate().expect("Failed to run migrations");
    db
}

fn add_post(db: &Database, title: &str, body: &str, status: PostStatus, tags: &[&str]) -> i64 {
    posts::create_post(
        db,
        CreatePost {
            title: title.to_string(),
            author: "ada".to_string(),
            body: body.to_string(),
            status,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        },
    )
    .expect("Failed to create post")
}

fn add_post_on(db: &Database, title: &str, day: u32, tags: &[&str]) -> i64 {
    posts::create_post(
        db,
        CreatePost {
            title: title.to_string(),
            author: "ada".to_string(),
            body: format!("Body of {}", title),
            status: PostStatus::Published,
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        },
    )
    .expect("Failed to create post")
}

mod visibility_tests {
    use super::*;

    #[test]
    fn test_drafts_are_never_listed() {
        let db = create_test_db();
        let published = add_post(&db, "Visible", "text", PostStatus::Published, &["rust"]);
        add_post(&db, "Hidden", "text", PostStatus::Draft, &["rust"]);

        let all = posts::published_posts(&db).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, published);

        assert_eq!(posts::count_published_posts(&db).unwrap(), 1);
        let listed = posts::list_published_posts(&db, 10, 0).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(posts::latest_published_posts(&db, 5).unwrap().len(), 1);
    }

    #[test]
    fn test_draft_detail_is_not_found() {
        let db = create_test_db();
        let draft = add_post(&db, "Hidden", "text", PostStatus::Draft, &[]);

        let err = posts::get_published_post(&db, draft).unwrap_err();
        assert!(err.is_not_found());
        assert!(posts::get_post(&db, draft).unwrap().is_some());
    }

    #[test]
    fn test_detail_by_date_and_slug() {
        let db = create_test_db();
        let id = add_post_on(&db, "Spring Notes", 5, &[]);

        let post = posts::get_published_post_by_date(&db, 2024, 3, 5, "spring-notes").unwrap();
        assert_eq!(post.id, id);
        assert_eq!(post.absolute_url(), "/blog/2024/3/5/spring-notes/");

        let wrong_day = posts::get_published_post_by_date(&db, 2024, 3, 6, "spring-notes");
        assert!(wrong_day.unwrap_err().is_not_found());

        let impossible = posts::get_published_post_by_date(&db, 2024, 2, 31, "spring-notes");
        assert!(impossible.unwrap_err().is_not_found());
    }

    #[test]
    fn test_listing_is_newest_first() {
        let db = create_test_db();
        let older = add_post_on(&db, "Older", 1, &[]);
        let newer = add_post_on(&db, "Newer", 2, &[]);

        let listed = posts::list_published_posts(&db, 10, 0).unwrap();
        let ids: Vec<i64> = listed.iter().map(|p| p.post.id).collect();
        assert_eq!(ids, vec![newer, older]);
    }

    #[test]
    fn test_publishing_makes_post_visible() {
        let db = create_test_db();
        let id = add_post(&db, "Soon", "text", PostStatus::Draft, &[]);
        assert!(posts::published_posts(&db).unwrap().is_empty());

        posts::publish_post(&db, id).unwrap();
        assert_eq!(posts::published_posts(&db).unwrap().len(), 1);
    }
}

mod post_tests {
    use super::*;

    #[test]
    fn test_slug_generated_from_title() {
        let db = create_test_db();
        let id = add_post(&db, "Hello, World!", "text", PostStatus::Draft, &[]);
        let post = posts::get_post(&db, id).unwrap().unwrap();
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.status, PostStatus::Draft);
    }

    #[test]
    fn test_slug_unique_per_publish_date() {
        let db = create_test_db();
        add_post_on(&db, "Same Title", 10, &[]);

        let duplicate = posts::create_post(
            &db,
            CreatePost {
                title: "Same Title".to_string(),
                author: "ada".to_string(),
                published_at: Some(Utc.with_ymd_and_hms(2024, 3, 10, 18, 30, 0).unwrap()),
                ..Default::default()
            },
        );
        match duplicate {
            Err(BlogError::Validation(errors)) => assert!(errors.has("slug")),
            other => panic!("expected a slug validation error, got {:?}", other),
        }

        // Same slug on another day is fine.
        add_post_on(&db, "Same Title", 11, &[]);
    }

    #[test]
    fn test_create_requires_title_and_author() {
        let db = create_test_db();
        let result = posts::create_post(
            &db,
            CreatePost {
                title: "   ".to_string(),
                slug: Some("manual".to_string()),
                author: String::new(),
                ..Default::default()
            },
        );
        match result {
            Err(BlogError::Validation(errors)) => {
                assert!(errors.has("title"));
                assert!(errors.has("author"));
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_updated_at_never_decreases() {
        let db = create_test_db();
        let id = add_post(&db, "Evolving", "v1", PostStatus::Draft, &[]);
        let before = posts::get_post(&db, id).unwrap().unwrap();

        posts::update_post(
            &db,
            id,
            UpdatePost {
                body: Some("v2".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let after = posts::get_post(&db, id).unwrap().unwrap();
        assert_eq!(after.body, "v2");
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn test_update_missing_post() {
        let db = create_test_db();
        let err = posts::update_post(&db, 999, UpdatePost::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_cascades_but_keeps_tags() {
        let db = create_test_db();
        let id = add_post(&db, "Doomed", "text", PostStatus::Published, &["keep-me"]);
        comments::submit_comment(
            &db,
            id,
            &CommentForm {
                name: "Bob".to_string(),
                email: String::new(),
                body: "Nice".to_string(),
            },
        )
        .unwrap();
        images::attach_image(&db, id, "cover.png").unwrap();

        posts::delete_post(&db, id).unwrap();

        assert!(comments::list_comments(&db, None, None).unwrap().is_empty());
        assert!(images::list_all_images(&db).unwrap().is_empty());
        assert!(tags::get_tag_by_slug(&db, "keep-me").unwrap().is_some());
        assert!(posts::delete_post(&db, id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_posts_filters_by_status_and_text() {
        let db = create_test_db();
        add_post(&db, "Draft about sqlite", "text", PostStatus::Draft, &[]);
        add_post(&db, "Published about axum", "text", PostStatus::Published, &[]);

        assert_eq!(posts::list_posts(&db, None, None).unwrap().len(), 2);
        let drafts = posts::list_posts(&db, Some(PostStatus::Draft), None).unwrap();
        assert_eq!(drafts.len(), 1);
        let axum = posts::list_posts(&db, None, Some("axum")).unwrap();
        assert_eq!(axum.len(), 1);
        assert_eq!(axum[0].title, "Published about axum");
    }
}

mod tag_tests {
    use super::*;

    #[test]
    fn test_tags_created_on_demand_and_deduplicated() {
        let db = create_test_db();
        let id = add_post(
            &db,
            "Tagged",
            "text",
            PostStatus::Published,
            &["Rust", " rust ", "Web Dev"],
        );

        let post_tags = tags::tags_for_post(&db, id).unwrap();
        let slugs: Vec<&str> = post_tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["rust", "web-dev"]);
    }

    #[test]
    fn test_posts_for_tag_only_published_with_tag() {
        let db = create_test_db();
        let a = add_post(&db, "A", "text", PostStatus::Published, &["rust"]);
        add_post(&db, "B", "text", PostStatus::Published, &["python"]);
        add_post(&db, "C", "text", PostStatus::Draft, &["rust"]);

        let tagged = tags::posts_for_tag(&db, "rust").unwrap();
        assert_eq!(tagged.tag.slug, "rust");
        assert_eq!(tagged.post_ids(), vec![a]);
    }

    #[test]
    fn test_posts_for_unknown_tag_is_not_found() {
        let db = create_test_db();
        let err = tags::posts_for_tag(&db, "nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_tag_counts_over_listing() {
        let db = create_test_db();
        let a = add_post(&db, "A", "text", PostStatus::Published, &["rust", "web"]);
        let b = add_post(&db, "B", "text", PostStatus::Published, &["rust"]);
        add_post(&db, "C", "text", PostStatus::Draft, &["rust", "draft-only"]);

        let counts = tags::tag_counts_over(&db, &[a, b]).unwrap();
        let pairs: Vec<(&str, i64)> = counts
            .iter()
            .map(|c| (c.tag.slug.as_str(), c.count))
            .collect();
        assert_eq!(pairs, vec![("rust", 2), ("web", 1)]);

        assert!(tags::tag_counts_over(&db, &[]).unwrap().is_empty());

        let published = tags::tag_counts_over_published(&db).unwrap();
        assert!(published.iter().all(|c| c.tag.slug != "draft-only"));
    }

    #[test]
    fn test_similar_posts_ranked_by_shared_tags() {
        let db = create_test_db();
        let anchor = add_post_on(&db, "Anchor", 1, &["rust", "web", "sql"]);
        let one_shared = add_post_on(&db, "One", 3, &["rust"]);
        let two_shared = add_post_on(&db, "Two", 2, &["rust", "web"]);
        add_post_on(&db, "None", 4, &["gardening"]);
        posts::create_post(
            &db,
            CreatePost {
                title: "Draft twin".to_string(),
                author: "ada".to_string(),
                status: PostStatus::Draft,
                tags: vec!["rust".into(), "web".into(), "sql".into()],
                ..Default::default()
            },
        )
        .unwrap();

        let anchor_post = posts::get_post(&db, anchor).unwrap().unwrap();
        let similar = tags::similar_posts(&db, &anchor_post, tags::SIMILAR_POSTS_LIMIT).unwrap();
        let ids: Vec<i64> = similar.iter().map(|p| p.post.id).collect();
        assert_eq!(ids, vec![two_shared, one_shared]);
        assert!(!ids.contains(&anchor));
    }

    #[test]
    fn test_similar_posts_respects_limit() {
        let db = create_test_db();
        let anchor = add_post_on(&db, "Anchor", 1, &["rust"]);
        for day in 2..=8 {
            add_post_on(&db, &format!("Post {}", day), day, &["rust"]);
        }
        let anchor_post = posts::get_post(&db, anchor).unwrap().unwrap();
        let similar = tags::similar_posts(&db, &anchor_post, tags::SIMILAR_POSTS_LIMIT).unwrap();
        assert_eq!(similar.len(), 4);
        assert_eq!(similar[0].post.title, "Post 8");
    }

    #[test]
    fn test_tag_listing_newest_first_with_counts() {
        let db = create_test_db();
        let older = add_post_on(&db, "Older", 1, &["rust", "cli"]);
        let newer = add_post_on(&db, "Newer", 2, &["rust"]);
        add_post_on(&db, "Elsewhere", 3, &["python"]);

        let tagged = tags::posts_for_tag(&db, "rust").unwrap();
        assert_eq!(tagged.post_ids(), vec![newer, older]);

        let counts = tags::tag_counts_over(&db, &tagged.post_ids()).unwrap();
        let pairs: Vec<(&str, i64)> = counts
            .iter()
            .map(|c| (c.tag.slug.as_str(), c.count))
            .collect();
        assert_eq!(pairs, vec![("rust", 2), ("cli", 1)]);
    }

    #[test]
    fn test_tag_counts_over_many_posts() {
        let db = create_test_db();
        let mut ids = Vec::new();
        for n in 0..1200 {
            let tags: &[&str] = if n % 2 == 0 { &["even", "all"] } else { &["all"] };
            ids.push(add_post(&db, &format!("Post {}", n), "", PostStatus::Published, tags));
        }

        let counts = tags::tag_counts_over(&db, &ids).unwrap();
        let pairs: Vec<(&str, i64)> = counts
            .iter()
            .map(|c| (c.tag.slug.as_str(), c.count))
            .collect();
        assert_eq!(pairs, vec![("all", 1200), ("even", 600)]);

        let page = posts::list_published_posts(&db, 1200, 0).unwrap();
        assert_eq!(page.len(), 1200);
        assert!(page.iter().all(|p| p.tags.iter().any(|t| t.slug == "all")));
    }
}

mod search_tests {
    use super::*;

    #[test]
    fn test_empty_query_returns_nothing() {
        let db = create_test_db();
        add_post(&db, "Anything", "at all", PostStatus::Published, &[]);
        assert!(search::search_posts(&db, "").unwrap().is_empty());
        assert!(search::search_posts(&db, "   ").unwrap().is_empty());
    }

    #[test]
    fn test_title_match_ranks_first() {
        let db = create_test_db();
        add_post(
            &db,
            "Cooking with cast iron",
            "Seasoning pans and removing rust spots.",
            PostStatus::Published,
            &[],
        );
        let target = add_post(
            &db,
            "Learning Rust ownership",
            "Borrowing rules explained.",
            PostStatus::Published,
            &[],
        );

        let hits = search::search_posts(&db, "Learning Rust ownership").unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].post.id, target);
    }

    #[test]
    fn test_exact_title_beats_repeated_mentions() {
        let db = create_test_db();
        let exact = add_post(&db, "Rust", "", PostStatus::Published, &[]);
        let chatty = add_post(
            &db,
            "Notes on rust",
            "rust rust rust rust rust",
            PostStatus::Published,
            &[],
        );

        let hits = search::search_posts(&db, "Rust").unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.post.id).collect();
        assert_eq!(ids, vec![exact, chatty]);
    }

    #[test]
    fn test_inflected_query_matches_stem() {
        let db = create_test_db();
        let cook = add_post(&db, "Cook", "Pans and pots.", PostStatus::Published, &[]);
        add_post(&db, "Tomatoes", "Beans.", PostStatus::Published, &[]);

        let hits = search::search_posts(&db, "cooking").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].post.id, cook);
        assert!(hits[0].rank >= search::SEARCH_THRESHOLD);
    }

    #[test]
    fn test_enriched_hits_carry_tags_and_urls() {
        let db = create_test_db();
        let id = add_post_on(&db, "Tagged result", 4, &["rust"]);

        let ranked = search::search_posts(&db, "tagged result").unwrap();
        let hits = search::enrich_hits(&db, ranked).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].post.post.id, id);
        assert_eq!(hits[0].post.url, "/blog/2024/3/4/tagged-result/");
        assert_eq!(hits[0].post.tags[0].slug, "rust");
    }

    #[test]
    fn test_drafts_are_not_searchable() {
        let db = create_test_db();
        add_post(&db, "Secret plans", "secret", PostStatus::Draft, &[]);
        assert!(search::search_posts(&db, "secret plans").unwrap().is_empty());
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let db = create_test_db();
        add_post(&db, "Gardening diary", "Tomatoes and beans.", PostStatus::Published, &[]);
        assert!(search::search_posts(&db, "kubernetes").unwrap().is_empty());
    }
}

mod comment_tests {
    use super::*;

    fn form(name: &str, body: &str) -> CommentForm {
        CommentForm {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_comment_on_draft_is_not_found() {
        let db = create_test_db();
        let draft = add_post(&db, "Draft", "text", PostStatus::Draft, &[]);
        let err = comments::submit_comment(&db, draft, &form("Bob", "Hi")).unwrap_err();
        assert!(err.is_not_found());
        assert!(comments::list_comments(&db, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_comment_on_missing_post_is_not_found() {
        let db = create_test_db();
        let err = comments::submit_comment(&db, 42, &form("Bob", "Hi")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_empty_body_comment_is_accepted() {
        let db = create_test_db();
        let id = add_post(&db, "Open", "text", PostStatus::Published, &[]);
        let comment = comments::submit_comment(&db, id, &form("Bob", "")).unwrap();
        assert_eq!(comment.body, "");
        assert!(comment.active);
        assert_eq!(comment.post_id, id);
    }

    #[test]
    fn test_invalid_comment_is_not_stored() {
        let db = create_test_db();
        let id = add_post(&db, "Open", "text", PostStatus::Published, &[]);
        let bad = CommentForm {
            name: "Bob".to_string(),
            email: "not-an-email".to_string(),
            body: "Hi".to_string(),
        };
        match comments::submit_comment(&db, id, &bad) {
            Err(BlogError::Validation(errors)) => assert!(errors.has("email")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(comments::active_comments(&db, id).unwrap().is_empty());
    }

    #[test]
    fn test_comment_round_trip_newest_first() {
        let db = create_test_db();
        let id = add_post(&db, "Open", "text", PostStatus::Published, &[]);
        let first = comments::submit_comment(&db, id, &form("Ann", "First")).unwrap();
        let second = comments::submit_comment(&db, id, &form("Ben", "Second")).unwrap();

        let active = comments::active_comments(&db, id).unwrap();
        let ids: Vec<i64> = active.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_hidden_comments_drop_out_of_counts() {
        let db = create_test_db();
        let id = add_post(&db, "Open", "text", PostStatus::Published, &[]);
        let c = comments::submit_comment(&db, id, &form("Ann", "Hi")).unwrap();

        let listed = posts::list_published_posts(&db, 10, 0).unwrap();
        assert_eq!(listed[0].comment_count, 1);

        comments::set_comment_active(&db, c.id, false).unwrap();
        assert!(comments::active_comments(&db, id).unwrap().is_empty());
        let listed = posts::list_published_posts(&db, 10, 0).unwrap();
        assert_eq!(listed[0].comment_count, 0);

        let hidden = comments::list_comments(&db, Some(id), Some(false)).unwrap();
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].to_string(), "comment by Ann on Open");

        comments::delete_comment(&db, c.id).unwrap();
        assert!(comments::delete_comment(&db, c.id).unwrap_err().is_not_found());
    }
}

mod contact_tests {
    use super::*;

    #[test]
    fn test_contact_messages_are_recorded() {
        let db = create_test_db();
        let saved = contact::record_contact_message(
            &db,
            &NewContactMessage {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                body: "Hello".to_string(),
            },
        )
        .unwrap();
        assert_eq!(saved.to_string(), "message from Ada");

        let all = contact::list_contact_messages(&db).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].body, "Hello");
    }
}

mod image_tests {
    use super::*;

    #[test]
    fn test_import_and_remove_image() {
        let db = create_test_db();
        let id = add_post(&db, "Pictures", "text", PostStatus::Published, &[]);

        let source_dir = tempfile::tempdir().unwrap();
        let media_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("photo.png");
        std::fs::write(&source, b"\x89PNG\r\n\x1a\nfake").unwrap();

        let image = images::import_image(&db, media_dir.path(), id, &source).unwrap();
        assert!(image.image.ends_with(".png"));
        assert!(media_dir.path().join(&image.image).exists());

        let listed = images::list_images(&db, id).unwrap();
        assert_eq!(listed.len(), 1);
        let all = images::list_all_images(&db).unwrap();
        assert_eq!(all[0].to_string(), "Pictures");

        images::remove_image(&db, media_dir.path(), image.id).unwrap();
        assert!(!media_dir.path().join(&image.image).exists());
        assert!(images::list_images(&db, id).unwrap().is_empty());
    }

    #[test]
    fn test_import_rejects_non_images() {
        let db = create_test_db();
        let id = add_post(&db, "Pictures", "text", PostStatus::Published, &[]);

        let source_dir = tempfile::tempdir().unwrap();
        let media_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("notes.txt");
        std::fs::write(&source, b"plain text").unwrap();

        let err = images::import_image(&db, media_dir.path(), id, &source).unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
    }

    #[test]
    fn test_attach_to_missing_post_is_not_found() {
        let db = create_test_db();
        let err = images::attach_image(&db, 7, "x.png").unwrap_err();
        assert!(err.is_not_found());
    }
}
