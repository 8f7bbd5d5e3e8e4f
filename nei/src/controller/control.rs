//! Control surface: serializable commands dispatched to a running engine.
//!
//! Every command is safe to issue at any time, including while the loop is
//! running. Failures come back as [`ControlResponse::Error`] rather than as
//! a Rust error so that a transport can forward them unchanged.

use super::{Engine, EngineStatus};
use crate::error::EngineError;
use crate::settings::PctOffset;
use crate::surface::{Point, Viewport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlCommand {
    Start,
    Stop,
    GetStatus,
    Combine { a: String, b: String },
    Place { name: String },
    CalibratePickup,
    CalibrateDrop,
    AddRestricted { name: String },
    RemoveRestricted { name: String },
    GetRestricted,
    SetBaseViewport { width: i64, height: i64 },
    GetBaseViewport,
    GetElements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlResponse {
    Running {
        running: bool,
    },
    Status(EngineStatus),
    Actuated {
        point: Point,
    },
    Calibrated {
        /// `None` when the operator cancelled.
        offset: Option<PctOffset>,
    },
    Restricted {
        restricted: Vec<String>,
    },
    BaseViewport {
        base: Option<Viewport>,
        current: Viewport,
    },
    Elements {
        elements: Vec<String>,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl ControlResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, ControlResponse::Error { .. })
    }
}

impl From<EngineError> for ControlResponse {
    fn from(e: EngineError) -> Self {
        ControlResponse::Error {
            reason: e.reason_code().map(str::to_string),
            error: e.to_string(),
        }
    }
}

fn respond<T>(result: Result<T, EngineError>, ok: impl FnOnce(T) -> ControlResponse) -> ControlResponse {
    match result {
        Ok(value) => ok(value),
        Err(e) => e.into(),
    }
}

impl Engine {
    pub async fn handle(&self, command: ControlCommand) -> ControlResponse {
        match command {
            ControlCommand::Start => {
                self.start();
                ControlResponse::Running { running: true }
            }
            ControlCommand::Stop => {
                self.stop();
                ControlResponse::Running { running: false }
            }
            ControlCommand::GetStatus => ControlResponse::Status(self.status().await),
            ControlCommand::Combine { a, b } => {
                respond(self.combine(&a, &b).await, |point| ControlResponse::Actuated { point })
            }
            ControlCommand::Place { name } => {
                respond(self.place(&name).await, |point| ControlResponse::Actuated { point })
            }
            ControlCommand::CalibratePickup => respond(self.calibrate_pickup().await, |offset| {
                ControlResponse::Calibrated { offset }
            }),
            ControlCommand::CalibrateDrop => respond(self.calibrate_drop().await, |offset| {
                ControlResponse::Calibrated { offset }
            }),
            ControlCommand::AddRestricted { name } => {
                respond(self.add_restricted(&name).await, |restricted| {
                    ControlResponse::Restricted { restricted }
                })
            }
            ControlCommand::RemoveRestricted { name } => {
                respond(self.remove_restricted(&name).await, |restricted| {
                    ControlResponse::Restricted { restricted }
                })
            }
            ControlCommand::GetRestricted => ControlResponse::Restricted {
                restricted: self.restricted().await,
            },
            ControlCommand::SetBaseViewport { width, height } => {
                let result = self.set_base_viewport(width, height).await;
                match result {
                    Ok(_) => {
                        let (base, current) = self.base_viewport().await;
                        ControlResponse::BaseViewport { base, current }
                    }
                    Err(e) => e.into(),
                }
            }
            ControlCommand::GetBaseViewport => {
                let (base, current) = self.base_viewport().await;
                ControlResponse::BaseViewport { base, current }
            }
            ControlCommand::GetElements => ControlResponse::Elements {
                elements: self.elements().await,
            },
        }
    }
}
