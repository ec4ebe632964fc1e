//! Ordering guarantees: strict FIFO by creation order regardless of which
//! producer task submitted the command.

mod common;

use std::sync::Arc;

use protocol_engine::commands::{CommandParams, CommandStatus, CommentParams};
use protocol_engine::RunStatus;

use common::build_engine;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_execute_in_creation_order() {
    let (engine, _gantry) = build_engine();
    let engine = Arc::new(engine);

    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 25;

    let mut handles = Vec::new();
    for producer in 0..PRODUCERS {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..PER_PRODUCER {
                let id = engine
                    .submit(CommandParams::Comment(CommentParams {
                        message: format!("producer {producer} message {i}"),
                    }))
                    .unwrap();
                ids.push(id);
                tokio::task::yield_now().await;
            }
            ids
        }));
    }
    futures::future::try_join_all(handles).await.unwrap();

    engine.finish();
    assert_eq!(engine.wait_until_complete().await, RunStatus::Succeeded);

    let log = engine.commands();
    assert_eq!(log.len(), PRODUCERS * PER_PRODUCER);

    // The log is the creation order; execution must follow it exactly.
    for pair in log.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
        assert!(pair[0].started_at.unwrap() <= pair[1].started_at.unwrap());
        assert!(pair[0].completed_at.unwrap() <= pair[1].started_at.unwrap());
    }
    for command in &log {
        assert_eq!(command.status, CommandStatus::Succeeded);
    }

    // Per-producer submission order is a subsequence of the log.
    for producer in 0..PRODUCERS {
        let tag = format!("producer {producer} ");
        let messages: Vec<&str> = log
            .iter()
            .filter_map(|c| match &c.params {
                CommandParams::Comment(p) if p.message.starts_with(&tag) => {
                    Some(p.message.as_str())
                }
                _ => None,
            })
            .collect();
        let expected: Vec<String> = (0..PER_PRODUCER)
            .map(|i| format!("producer {producer} message {i}"))
            .collect();
        assert_eq!(messages, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn submission_returns_ids_synchronously_in_order() {
    let (engine, _gantry) = build_engine();

    let first = engine
        .submit(CommandParams::Comment(CommentParams {
            message: "first".into(),
        }))
        .unwrap();
    let second = engine
        .submit(CommandParams::Comment(CommentParams {
            message: "second".into(),
        }))
        .unwrap();

    let log = engine.commands();
    assert_eq!(log[0].id, first);
    assert_eq!(log[1].id, second);

    engine.finish();
    assert_eq!(engine.wait_until_complete().await, RunStatus::Succeeded);
}
