//! Viewport controller state machine.
//!
//! Owns the authoritative viewport and arbitrates between the two change
//! sources: user gestures reported by the provider and programmatic
//! commands from the UI layer. The controller is synchronous and performs
//! no I/O: callers feed it events and apply the returned [`Effect`]s, which
//! keeps every transition unit-testable without a runtime.
//!
//! Commands queue at most one deep per kind while a transition is in
//! flight; a newer request of a kind replaces its pending predecessor
//! (which is acknowledged as superseded). Recenter is a level-triggered
//! flag and re-assertions while it is in flight are dropped outright; the
//! standing assertion is acknowledged by the in-flight command.

use std::collections::VecDeque;
use std::fmt;

use crate::coord::LatLon;

use super::viewport::Viewport;

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Nothing in flight.
    Idle,
    /// A gesture is in progress or just completed.
    UserInteracting,
    /// A programmatic command is in flight.
    ProgrammaticTransition,
}

/// Command kinds, used for queue slots and acknowledgments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Recenter,
    ZoomToFit,
    AnimateTo,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Recenter => "recenter",
            CommandKind::ZoomToFit => "zoom-to-fit",
            CommandKind::AnimateTo => "animate-to",
        };
        write!(f, "{name}")
    }
}

/// Programmatic viewport commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Center on the last known user location at the recenter zoom.
    Recenter,
    /// Fit the current point collection.
    ZoomToFit,
    /// Animate to a coordinate handed back by a detail view.
    AnimateTo(LatLon),
}

impl Command {
    /// The command's queue slot.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Recenter => CommandKind::Recenter,
            Command::ZoomToFit => CommandKind::ZoomToFit,
            Command::AnimateTo(_) => CommandKind::AnimateTo,
        }
    }
}

/// Provider calls the session must issue on the controller's behalf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProviderCall {
    /// Jump the camera (recenter).
    SetCenterAndZoom { center: LatLon, zoom: f64 },
    /// Animated transition to a target.
    AnimateTo { center: LatLon, zoom: f64 },
    /// Fit the current point collection; the session resolves the box.
    FitPoints,
}

/// Side effects of a controller step, applied by the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Issue a provider call for the now-active command.
    Provider { kind: CommandKind, call: ProviderCall },
    /// Fire the acknowledgment callback for a command kind.
    Ack(CommandKind),
    /// The authoritative viewport changed; publish and notify.
    ViewportChanged(Viewport),
    /// Run the prefetch movement hook.
    MovementHook { gesture: bool, zoom_changed: bool },
}

/// Outcome of a command request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    /// Effects to apply.
    pub effects: Vec<Effect>,
    /// Whether the request was accepted (false: dropped as a repeated
    /// assertion of an in-flight level trigger).
    pub accepted: bool,
}

/// The viewport controller.
#[derive(Debug)]
pub struct ViewportController {
    state: ControllerState,
    viewport: Viewport,
    active: Option<CommandKind>,
    pending: VecDeque<Command>,
    user_location: Option<LatLon>,
    recenter_zoom: f64,
}

impl ViewportController {
    /// Create a controller owning the given viewport.
    pub fn new(viewport: Viewport, recenter_zoom: f64) -> Self {
        Self {
            state: ControllerState::Idle,
            viewport,
            active: None,
            pending: VecDeque::new(),
            user_location: None,
            recenter_zoom,
        }
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Current authoritative viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Update the last known user location.
    pub fn set_user_location(&mut self, location: Option<LatLon>) {
        self.user_location = location;
    }

    /// A gesture moved the camera.
    ///
    /// Moves to `UserInteracting` from any state; an in-flight command
    /// still completes and acknowledges later.
    pub fn on_gesture(&mut self, center: LatLon, zoom: f64) -> Vec<Effect> {
        self.state = ControllerState::UserInteracting;
        self.apply_camera(center, zoom)
    }

    /// The provider applied a programmatic camera change.
    pub fn on_provider_echo(&mut self, center: LatLon, zoom: f64) -> Vec<Effect> {
        self.apply_camera(center, zoom)
    }

    fn apply_camera(&mut self, center: LatLon, zoom: f64) -> Vec<Effect> {
        let zoom_changed = (zoom - self.viewport.zoom).abs() > f64::EPSILON;
        self.viewport = Viewport::new(center, zoom);
        vec![
            Effect::ViewportChanged(self.viewport),
            Effect::MovementHook {
                gesture: self.state == ControllerState::UserInteracting,
                zoom_changed,
            },
        ]
    }

    /// Request a programmatic command.
    pub fn request(&mut self, command: Command) -> RequestOutcome {
        let kind = command.kind();
        let mut effects = Vec::new();

        // Recenter is level-triggered and idempotent: re-assertions while
        // one is in flight are dropped, the in-flight one acks the flag
        if kind == CommandKind::Recenter
            && (self.active == Some(kind) || self.pending.iter().any(|c| c.kind() == kind))
        {
            return RequestOutcome {
                effects,
                accepted: false,
            };
        }

        // One slot per kind: a newer request replaces the pending one,
        // which is acknowledged as superseded
        if let Some(slot) = self.pending.iter_mut().find(|c| c.kind() == kind) {
            *slot = command;
            effects.push(Effect::Ack(kind));
            return RequestOutcome {
                effects,
                accepted: true,
            };
        }

        self.pending.push_back(command);
        if self.active.is_none() {
            self.start_next(&mut effects);
        }

        RequestOutcome {
            effects,
            accepted: true,
        }
    }

    /// The in-flight command's provider transition completed.
    pub fn on_command_completed(&mut self, kind: CommandKind) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.active != Some(kind) {
            tracing::debug!(%kind, "Completion for a command that is not active, ignoring");
            return effects;
        }

        self.active = None;
        effects.push(Effect::Ack(kind));
        self.start_next(&mut effects);
        effects
    }

    /// Start the next pending command, draining no-ops.
    fn start_next(&mut self, effects: &mut Vec<Effect>) {
        while let Some(command) = self.pending.pop_front() {
            match self.build_call(&command) {
                Some(call) => {
                    self.active = Some(command.kind());
                    self.state = ControllerState::ProgrammaticTransition;
                    effects.push(Effect::Provider {
                        kind: command.kind(),
                        call,
                    });
                    return;
                }
                // No-op command: acknowledge immediately, keep draining
                None => effects.push(Effect::Ack(command.kind())),
            }
        }

        // Queue drained; leave UserInteracting alone if a gesture arrived
        // after the last command started
        if self.state == ControllerState::ProgrammaticTransition {
            self.state = ControllerState::Idle;
        }
    }

    /// Translate a command into a provider call, or `None` for a no-op.
    fn build_call(&self, command: &Command) -> Option<ProviderCall> {
        match command {
            Command::Recenter => {
                let center = self.user_location?;
                Some(ProviderCall::SetCenterAndZoom {
                    center,
                    zoom: self.recenter_zoom,
                })
            }
            Command::ZoomToFit => Some(ProviderCall::FitPoints),
            Command::AnimateTo(target) => Some(ProviderCall::AnimateTo {
                center: *target,
                zoom: self.viewport.zoom,
            }),
        }
    }
}
