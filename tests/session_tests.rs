// Integration tests for a bridged call session
//
// Each test drives a CallSession through in-memory connections: one peer
// plays the telephony provider, the other plays the voice agent.

use anyhow::{Context, Result};
use base64::Engine;
use call_bridge::transport::channel::{pair, Peer};
use call_bridge::{
    BridgeError, CallSession, FnTool, SessionConfig, SessionHandle, SessionState, SessionStats,
    ToolError, ToolRegistry, WireMessage,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

struct Call {
    telephony: Peer,
    agent: Peer,
    handle: SessionHandle,
    task: JoinHandle<Result<SessionStats, BridgeError>>,
}

fn start_call(tools: ToolRegistry) -> Call {
    let (telephony_conn, telephony) = pair();
    let (agent_conn, agent) = pair();

    let config = SessionConfig::new(json!({ "type": "Settings", "test": true }));
    let session = CallSession::new(config, Arc::new(tools));
    let handle = session.handle();
    let task = tokio::spawn(session.run(telephony_conn, agent_conn));

    Call {
        telephony,
        agent,
        handle,
        task,
    }
}

fn start_event(stream_sid: &str) -> Value {
    json!({
        "event": "start",
        "sequenceNumber": "1",
        "streamSid": stream_sid,
        "start": {
            "streamSid": stream_sid,
            "callSid": "CA0001",
            "accountSid": "AC0001",
            "tracks": ["inbound"],
            "mediaFormat": { "encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1 },
            "customParameters": {}
        }
    })
}

fn media_event(stream_sid: &str, audio: &[u8]) -> Value {
    json!({
        "event": "media",
        "streamSid": stream_sid,
        "media": {
            "track": "inbound",
            "chunk": "1",
            "timestamp": "20",
            "payload": base64::engine::general_purpose::STANDARD.encode(audio)
        }
    })
}

fn stop_event(stream_sid: &str) -> Value {
    json!({ "event": "stop", "streamSid": stream_sid, "stop": { "callSid": "CA0001" } })
}

/// Next message the bridge sent to `peer`; fails if the bridge closed it.
async fn next_message(peer: &mut Peer) -> Result<WireMessage> {
    timeout(WAIT, peer.recv())
        .await?
        .context("connection closed by bridge")
}

async fn next_json(peer: &mut Peer) -> Result<Value> {
    match next_message(peer).await? {
        WireMessage::Text(text) => Ok(serde_json::from_str(&text)?),
        other => anyhow::bail!("expected text message, got {:?}", other),
    }
}

/// Wait for the bridge to close the connection to `peer`, returning anything
/// it sent first.
async fn drain_until_closed(peer: &mut Peer) -> Result<Vec<WireMessage>> {
    let mut messages = Vec::new();
    while let Some(message) = timeout(WAIT, peer.recv()).await? {
        messages.push(message);
    }
    Ok(messages)
}

async fn finish(task: JoinHandle<Result<SessionStats, BridgeError>>) -> Result<Result<SessionStats, BridgeError>> {
    Ok(timeout(WAIT, task).await??)
}

fn caller_audio(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_settings_handshake_is_sent_first() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());

    let settings = next_json(&mut call.agent).await?;
    assert_eq!(settings, json!({ "type": "Settings", "test": true }));

    call.telephony.hang_up();
    finish(call.task).await??;
    Ok(())
}

#[tokio::test]
async fn test_caller_audio_reaches_agent_in_whole_batches() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    // Setup: two full 3200-byte batches plus 100 trailing bytes
    let audio = caller_audio(2 * 3200 + 100);
    call.telephony.send_json(&start_event("MZ100"));
    for chunk in audio.chunks(160) {
        call.telephony.send_json(&media_event("MZ100", chunk));
    }
    call.telephony.send_json(&stop_event("MZ100"));

    let forwarded = drain_until_closed(&mut call.agent).await?;
    assert_eq!(
        forwarded,
        vec![
            WireMessage::Binary(audio[..3200].to_vec()),
            WireMessage::Binary(audio[3200..6400].to_vec()),
        ]
    );

    let stats = finish(call.task).await??;
    assert_eq!(stats.stream_sid.as_deref(), Some("MZ100"));
    assert_eq!(stats.frames_to_agent, 2);
    assert_eq!(stats.bytes_to_agent, 6400);
    assert_eq!(stats.state, SessionState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_outbound_track_is_not_forwarded() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ101"));
    let mut outbound = media_event("MZ101", &caller_audio(3200));
    outbound["media"]["track"] = json!("outbound");
    call.telephony.send_json(&outbound);
    call.telephony.send_json(&stop_event("MZ101"));

    assert!(drain_until_closed(&mut call.agent).await?.is_empty());
    finish(call.task).await??;
    Ok(())
}

#[tokio::test]
async fn test_barge_in_clears_caller_playback_once() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ200"));
    call.agent.send_json(&json!({ "type": "UserStartedSpeaking" }));

    let clear = next_json(&mut call.telephony).await?;
    assert_eq!(clear, json!({ "event": "clear", "streamSid": "MZ200" }));

    call.telephony.send_json(&stop_event("MZ200"));
    assert!(drain_until_closed(&mut call.telephony).await?.is_empty());

    let stats = finish(call.task).await??;
    assert_eq!(stats.clears_sent, 1);
    Ok(())
}

#[tokio::test]
async fn test_agent_audio_is_relayed_to_caller() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ300"));
    call.agent.send_binary(vec![1, 2, 3]);
    call.agent.send_binary(vec![4, 5, 6]);

    let first = next_json(&mut call.telephony).await?;
    assert_eq!(
        first,
        json!({ "event": "media", "streamSid": "MZ300", "media": { "payload": "AQID" } })
    );
    let second = next_json(&mut call.telephony).await?;
    assert_eq!(second["media"]["payload"], json!("BAUG"));

    call.telephony.hang_up();
    let stats = finish(call.task).await??;
    assert_eq!(stats.audio_messages_to_caller, 2);
    Ok(())
}

#[tokio::test]
async fn test_agent_audio_waits_for_stream_start() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    // Agent speaks before the caller's stream has started
    call.agent.send_binary(vec![9, 9, 9]);
    let early = timeout(Duration::from_millis(200), call.telephony.recv()).await;
    assert!(early.is_err(), "nothing may reach the caller before start");

    call.telephony.send_json(&start_event("MZ400"));
    let media = next_json(&mut call.telephony).await?;
    assert_eq!(media["event"], json!("media"));
    assert_eq!(media["streamSid"], json!("MZ400"));

    call.telephony.hang_up();
    finish(call.task).await??;
    Ok(())
}

#[tokio::test]
async fn test_unknown_control_event_is_ignored() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ500"));
    call.agent.send_json(&json!({ "type": "SomethingNew", "detail": 1 }));
    call.agent.send_json(&json!({ "type": "ConversationText", "role": "assistant", "content": "hi" }));
    call.agent.send_binary(vec![7]);

    let media = next_json(&mut call.telephony).await?;
    assert_eq!(media["event"], json!("media"));
    assert!(!call.task.is_finished());

    call.telephony.hang_up();
    finish(call.task).await??;
    Ok(())
}

#[tokio::test]
async fn test_malformed_agent_message_ends_session_with_error() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ600"));
    call.agent.send_text("this is not json");

    let result = finish(call.task).await?;
    assert!(matches!(result, Err(BridgeError::ProtocolViolation(_))));
    assert_eq!(call.handle.state(), SessionState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_malformed_telephony_event_ends_session_with_error() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_text("{\"event\": \"media\"");

    let result = finish(call.task).await?;
    assert!(matches!(result, Err(BridgeError::ProtocolViolation(_))));

    // Both connections are closed on teardown
    assert!(drain_until_closed(&mut call.agent).await?.is_empty());
    assert!(drain_until_closed(&mut call.telephony).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_caller_hang_up_tears_down_session() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ700"));
    call.telephony.send_json(&media_event("MZ700", &caller_audio(3200)));
    call.telephony.hang_up();

    let stats = finish(call.task).await??;
    assert_eq!(stats.state, SessionState::Closed);
    assert_eq!(call.handle.state(), SessionState::Closed);

    // The batch queued before the hang-up still went out
    let forwarded = drain_until_closed(&mut call.agent).await?;
    assert_eq!(forwarded.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_agent_hang_up_ends_session_normally() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ800"));
    call.agent.hang_up();

    let stats = finish(call.task).await??;
    assert_eq!(stats.state, SessionState::Closed);
    assert!(drain_until_closed(&mut call.telephony).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() -> Result<()> {
    let mut first = start_call(ToolRegistry::new());
    let mut second = start_call(ToolRegistry::new());
    next_json(&mut first.agent).await?;
    next_json(&mut second.agent).await?;

    first.telephony.send_json(&start_event("MZ-A"));
    second.telephony.send_json(&start_event("MZ-B"));

    let audio_a = vec![0x11u8; 3200];
    let audio_b = vec![0x22u8; 3200];
    first.telephony.send_json(&media_event("MZ-A", &audio_a));
    second.telephony.send_json(&media_event("MZ-B", &audio_b));

    assert_eq!(next_message(&mut first.agent).await?, WireMessage::Binary(audio_a));
    assert_eq!(next_message(&mut second.agent).await?, WireMessage::Binary(audio_b));

    // Barge-in on the first call only touches the first caller
    first.agent.send_json(&json!({ "type": "UserStartedSpeaking" }));
    let clear = next_json(&mut first.telephony).await?;
    assert_eq!(clear["streamSid"], json!("MZ-A"));

    first.telephony.send_json(&stop_event("MZ-A"));
    finish(first.task).await??;

    // The second call is unaffected by the first ending
    assert!(!second.task.is_finished());
    assert!(second.telephony.try_recv().is_none());
    second.agent.send_binary(vec![5]);
    let media = next_json(&mut second.telephony).await?;
    assert_eq!(media["streamSid"], json!("MZ-B"));

    second.telephony.send_json(&stop_event("MZ-B"));
    finish(second.task).await??;
    Ok(())
}

#[tokio::test]
async fn test_client_side_function_call_is_answered() -> Result<()> {
    let tools = ToolRegistry::new().with_tool(FnTool::new("check_order_status", |args| {
        let order_id = args["order_id"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("order_id missing".to_string()))?;
        Ok(json!({ "order_id": order_id, "status": "shipped" }))
    }));
    let mut call = start_call(tools);
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ900"));
    call.agent.send_json(&json!({
        "type": "FunctionCallRequest",
        "functions": [
            {
                "id": "fc_server",
                "name": "web_search",
                "arguments": "{}",
                "client_side": false
            },
            {
                "id": "fc_1",
                "name": "check_order_status",
                "arguments": "{\"order_id\": \"A-42\"}",
                "client_side": true
            },
            {
                "id": "fc_2",
                "name": "unknown_tool",
                "arguments": "",
                "client_side": true
            }
        ]
    }));

    let response = next_json(&mut call.agent).await?;
    assert_eq!(response["type"], json!("FunctionCallResponse"));
    assert_eq!(response["id"], json!("fc_1"));
    assert_eq!(response["name"], json!("check_order_status"));
    let content: Value = serde_json::from_str(response["content"].as_str().context("content")?)?;
    assert_eq!(content, json!({ "order_id": "A-42", "status": "shipped" }));

    // A failing tool still gets a response carrying the error
    let failed = next_json(&mut call.agent).await?;
    assert_eq!(failed["id"], json!("fc_2"));
    let content: Value = serde_json::from_str(failed["content"].as_str().context("content")?)?;
    assert!(content["error"].as_str().is_some());

    call.telephony.hang_up();
    let stats = finish(call.task).await??;
    assert_eq!(stats.tool_calls, 2);
    Ok(())
}

#[tokio::test]
async fn test_agent_hang_up_before_start_ends_session() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    // The agent goes away before the caller's stream has started
    call.agent.hang_up();

    let stats = finish(call.task).await??;
    assert_eq!(stats.state, SessionState::Closed);
    assert!(stats.stream_sid.is_none());
    assert!(drain_until_closed(&mut call.telephony).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_agent_messages_before_start_are_routed_in_order() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.agent.send_binary(vec![1]);
    call.agent.send_json(&json!({ "type": "UserStartedSpeaking" }));
    call.agent.send_binary(vec![2]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(call.telephony.try_recv().is_none());

    call.telephony.send_json(&start_event("MZ-EARLY"));

    let first = next_json(&mut call.telephony).await?;
    assert_eq!(first["event"], json!("media"));
    assert_eq!(first["media"]["payload"], json!("AQ=="));
    let second = next_json(&mut call.telephony).await?;
    assert_eq!(second, json!({ "event": "clear", "streamSid": "MZ-EARLY" }));
    let third = next_json(&mut call.telephony).await?;
    assert_eq!(third["media"]["payload"], json!("Ag=="));

    call.telephony.hang_up();
    let stats = finish(call.task).await??;
    assert_eq!(stats.audio_messages_to_caller, 2);
    assert_eq!(stats.clears_sent, 1);
    Ok(())
}

#[tokio::test]
async fn test_agent_send_failure_closes_session() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ-FAIL"));
    // The agent stops reading, so forwarding the next batch fails
    call.agent.close_receiving();
    call.telephony.send_json(&media_event("MZ-FAIL", &caller_audio(3200)));

    let stats = finish(call.task).await??;
    assert_eq!(stats.state, SessionState::Closed);
    assert_eq!(stats.frames_to_agent, 0);
    assert_eq!(call.handle.state(), SessionState::Closed);
    assert!(drain_until_closed(&mut call.telephony).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_loosely_typed_agent_error_keeps_call_up() -> Result<()> {
    let mut call = start_call(ToolRegistry::new());
    next_json(&mut call.agent).await?;

    call.telephony.send_json(&start_event("MZ-LOOSE"));
    call.agent.send_json(&json!({ "type": "Error", "description": "x", "code": 123 }));
    call.agent.send_json(&json!({ "type": "AgentThinking", "content": null }));
    call.agent.send_binary(vec![7]);

    let media = next_json(&mut call.telephony).await?;
    assert_eq!(media["event"], json!("media"));
    assert!(!call.task.is_finished());

    call.telephony.hang_up();
    finish(call.task).await??;
    Ok(())
}
