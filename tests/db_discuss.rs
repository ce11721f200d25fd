//! Postgres repository checks. These need a database reachable through
//! `DATABASE_URL` and are run with `cargo test -- --ignored`.

use std::collections::HashSet;
use std::sync::Arc;

use discuss::application::pagination::Window;
use discuss::application::repos::{
    BoardsRepo, BoardsWriteRepo, CreateBoardParams, CreateReplyParams, CreateTopicParams,
    RepliesRepo, RepliesWriteRepo, RepoError, ReplyScope, TopicScope, TopicsRepo,
    TopicsWriteRepo,
};
use discuss::domain::entities::BoardRecord;
use discuss::infra::db::PostgresRepositories;
use sqlx::PgPool;
use uuid::Uuid;

async fn create_board(repos: &PostgresRepositories, tag: &str) -> BoardRecord {
    repos
        .create_board(CreateBoardParams {
            tag: tag.to_string(),
            name: tag.to_uppercase(),
            description: String::new(),
        })
        .await
        .expect("create board")
}

fn topic_params(board_id: Uuid, ref_id: Option<&str>) -> CreateTopicParams {
    CreateTopicParams {
        board_id,
        user_id: Uuid::new_v4(),
        ref_type: "article".to_string(),
        ref_id: ref_id.map(str::to_string),
        name: "Topic".to_string(),
        tags: String::new(),
        content: "<p>body</p>".to_string(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn discuss_indexes_exist(pool: PgPool) {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public' \
         AND tablename IN ('topics', 'replies')",
    )
    .fetch_all(&pool)
    .await
    .expect("fetch indexes");

    let indexes: HashSet<String> = rows.into_iter().collect();
    for name in [
        "topics_board_activity_idx",
        "topics_ref_activity_idx",
        "topics_created_idx",
        "replies_thread_idx",
        "replies_created_idx",
    ] {
        assert!(indexes.contains(name), "missing {name}");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn boards_keep_display_order_and_unique_tags(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let first = create_board(&repos, "first").await;
    let second = create_board(&repos, "second").await;
    assert_eq!(second.display_order, first.display_order + 1);

    let duplicate = repos
        .create_board(CreateBoardParams {
            tag: "first".to_string(),
            name: "Again".to_string(),
            description: String::new(),
        })
        .await;
    assert!(matches!(duplicate, Err(RepoError::Duplicate { .. })));

    repos
        .reorder_boards(&[second.id, first.id])
        .await
        .expect("reorder");
    let tags: Vec<_> = repos
        .list_boards()
        .await
        .expect("list boards")
        .into_iter()
        .map(|board| board.tag)
        .collect();
    assert_eq!(tags, ["second", "first"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn replies_bump_topic_and_delete_cascades(pool: PgPool) {
    let repos = Arc::new(PostgresRepositories::new(pool));
    let board = create_board(&repos, "general").await;
    let topic = repos
        .create_topic(topic_params(board.id, Some("article-1")))
        .await
        .expect("create topic");
    let board = repos
        .find_board(board.id)
        .await
        .expect("find board")
        .expect("board exists");
    assert_eq!(board.topic_count, 1);

    let mut reply_ids = Vec::new();
    for _ in 0..3 {
        let created = repos
            .create_reply(CreateReplyParams {
                topic_id: topic.id,
                user_id: Uuid::new_v4(),
                content: "<p>reply</p>".to_string(),
            })
            .await
            .expect("create reply");
        reply_ids.push(created.reply.id);
        assert_eq!(created.topic.reply_count, reply_ids.len() as i64);
    }

    let thread = repos
        .list_replies(ReplyScope::Topic(topic.id), Window::head(10))
        .await
        .expect("thread");
    let thread_ids: Vec<_> = thread.iter().map(|reply| reply.id).collect();
    assert_eq!(thread_ids, reply_ids);
    assert_eq!(
        repos
            .count_replies_before(topic.id, reply_ids[2])
            .await
            .expect("count before"),
        2
    );
    assert_eq!(
        repos
            .count_topics(&TopicScope::Ref("article-1".to_string()))
            .await
            .expect("count ref topics"),
        1
    );

    let deleted = repos
        .mark_reply_deleted(reply_ids[0])
        .await
        .expect("mark deleted");
    assert!(deleted.reply.deleted);
    assert_eq!(deleted.topic.version, topic.version + 4);

    let removed = repos.delete_topic(topic.id).await.expect("delete topic");
    let removed_ids: HashSet<_> = removed.reply_ids.into_iter().collect();
    assert_eq!(removed_ids, reply_ids.into_iter().collect());
    assert_eq!(
        repos
            .count_replies(ReplyScope::Topic(topic.id))
            .await
            .expect("count replies"),
        0
    );
    assert!(matches!(
        repos.delete_topic(topic.id).await,
        Err(RepoError::NotFound)
    ));
}
