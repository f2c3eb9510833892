use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::messages::{AgentCommand, ControlEvent, FunctionCall};
use crate::error::BridgeError;
use crate::session::SessionHandle;
use crate::telephony::TelephonyCommand;
use crate::tools::{ToolError, ToolRegistry};
use crate::transport::SharedSink;

/// Acts on agent control events for one stream.
pub struct ControlEventHandler {
    stream_sid: String,
    session: SessionHandle,
    tools: Arc<ToolRegistry>,
}

impl ControlEventHandler {
    pub fn new(stream_sid: String, session: SessionHandle, tools: Arc<ToolRegistry>) -> Self {
        Self {
            stream_sid,
            session,
            tools,
        }
    }

    pub async fn handle(
        &self,
        event: ControlEvent,
        telephony: &SharedSink,
        agent: &SharedSink,
    ) -> Result<(), BridgeError> {
        match event {
            ControlEvent::UserStartedSpeaking => {
                debug!("Caller started speaking, clearing playback");
                let clear = TelephonyCommand::clear(&self.stream_sid).to_wire()?;
                telephony.lock().await.send(clear).await?;
                self.session.counters().record_clear();
            }

            ControlEvent::FunctionCallRequest { functions } => {
                for call in functions {
                    if !call.client_side {
                        debug!("Agent runs {} server-side", call.name);
                        continue;
                    }
                    let response = self.execute(call).await.to_wire()?;
                    agent.lock().await.send(response).await?;
                }
            }

            ControlEvent::Welcome { request_id } => {
                info!("Agent session opened (request: {:?})", request_id);
            }

            ControlEvent::SettingsApplied => info!("Agent accepted settings"),

            ControlEvent::ConversationText { role, content } => {
                debug!("{:?}: {:?}", role, content);
            }

            ControlEvent::Error { description, code } => {
                warn!("Agent error {:?}: {:?}", code, description);
            }

            ControlEvent::Warning { description, code } => {
                warn!("Agent warning {:?}: {:?}", code, description);
            }

            other => debug!("Agent event: {:?}", other),
        }

        Ok(())
    }

    async fn execute(&self, call: FunctionCall) -> AgentCommand {
        let arguments = if call.arguments.trim().is_empty() {
            Ok(Value::Object(Default::default()))
        } else {
            serde_json::from_str(&call.arguments)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))
        };

        let result = match arguments {
            Ok(arguments) => self.tools.invoke(&call.name, arguments).await,
            Err(e) => Err(e),
        };

        let content = match result {
            Ok(value) => {
                info!("Tool {} completed", call.name);
                value
            }
            Err(e) => {
                warn!("Tool {} failed: {}", call.name, e);
                json!({ "error": e.to_string() })
            }
        };
        self.session.counters().record_tool_call();

        AgentCommand::FunctionCallResponse {
            id: call.id,
            name: call.name,
            content: content.to_string(),
        }
    }
}
