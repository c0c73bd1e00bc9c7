//! Admission errors are synchronous: no job exists, nothing executes.

use craftops::command::CommandPayload;
use craftops::errors::CraftopsError;
use craftops::job::JobId;

use craftops_test_utils::builders::{set_block, DenyAll, EngineBuilder};
use craftops_test_utils::init_tracing;

#[tokio::test]
async fn unknown_command_type_is_rejected() {
    init_tracing();
    let (engine, executor, _audit) = EngineBuilder::new().build();

    let payload = CommandPayload::new("meltWorld", serde_json::Map::new());
    let err = engine
        .submit("world-1", "alice", vec![payload])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CraftopsError::UnknownCommandType(kind) if kind == "meltWorld"
    ));
    assert_eq!(executor.call_count(), 0);
    assert!(engine.list().is_empty());
}

#[tokio::test]
async fn empty_command_list_is_rejected() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new().build();

    let err = engine.submit("world-1", "alice", vec![]).await.unwrap_err();
    assert!(matches!(err, CraftopsError::EmptyCommandList));
}

#[tokio::test]
async fn missing_required_param_is_rejected_with_index() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new().build();

    // Second command is a setBlock without its `block` param.
    let mut broken = serde_json::Map::new();
    broken.insert("x".into(), serde_json::json!(1));
    broken.insert("y".into(), serde_json::json!(2));
    broken.insert("z".into(), serde_json::json!(3));
    let payloads = vec![
        set_block(0, 64, 0, "minecraft:stone"),
        CommandPayload::new("setBlock", broken),
    ];

    let err = engine.submit("world-1", "alice", payloads).await.unwrap_err();
    match err {
        CraftopsError::MissingParam { index, kind, param } => {
            assert_eq!(index, 1);
            assert_eq!(kind, "setBlock");
            assert_eq!(param, "block");
        }
        other => panic!("expected MissingParam, got {other:?}"),
    }
}

#[tokio::test]
async fn ill_typed_param_is_rejected() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new().build();

    let mut params = serde_json::Map::new();
    params.insert("from".into(), serde_json::json!([0, 0]));
    params.insert("to".into(), serde_json::json!([1, 1, 1]));
    params.insert("block".into(), serde_json::json!("minecraft:air"));
    let payloads = vec![CommandPayload::new("fill", params)];

    let err = engine.submit("world-1", "alice", payloads).await.unwrap_err();
    assert!(matches!(err, CraftopsError::InvalidParam { param, .. } if param == "from"));
}

#[tokio::test]
async fn permission_denied_blocks_admission() {
    init_tracing();
    let (engine, executor, _audit) = EngineBuilder::new().with_permissions(DenyAll).build();

    let err = engine
        .submit("world-1", "mallory", vec![set_block(0, 64, 0, "minecraft:tnt")])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CraftopsError::PermissionDenied { identity, .. } if identity == "mallory"
    ));
    assert_eq!(executor.call_count(), 0);
    assert!(engine.list().is_empty());
}

#[tokio::test]
async fn unknown_job_id_is_not_found() {
    init_tracing();
    let (engine, _executor, _audit) = EngineBuilder::new().build();

    let missing = JobId::new();
    assert!(matches!(
        engine.get(missing),
        Err(CraftopsError::JobNotFound(id)) if id == missing
    ));
    assert!(matches!(
        engine.pause(missing),
        Err(CraftopsError::JobNotFound(_))
    ));
    assert!(matches!(
        engine.cancel(missing),
        Err(CraftopsError::JobNotFound(_))
    ));
    assert!(matches!(
        engine.revert(missing).await,
        Err(CraftopsError::JobNotFound(_))
    ));
}
