use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed,
    /// The circuit is open and calls are rejected.
    Open,
    /// The circuit is probing: calls run and their outcome decides the next state.
    HalfOpen,
}

impl CircuitState {
    /// Returns the state name as used in metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission to run one call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Admission {
    /// Holds one of the limited half-open probe slots.
    pub(crate) probe: bool,
    /// Half-open period the probe slot belongs to.
    generation: u64,
}

/// State machine behind a breaker. Events produced while the lock is held
/// are pushed to `events` and emitted by the caller after unlocking.
pub(crate) struct Circuit {
    state: CircuitState,
    failure_count: usize,
    success_count: usize,
    last_failure_time: Option<Instant>,
    probes_in_flight: usize,
    /// Bumped on every entry into HalfOpen. Slots taken in an earlier
    /// half-open period were already cleared when it ended.
    half_open_generation: u64,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            probes_in_flight: 0,
            half_open_generation: 0,
        }
    }
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.failure_count, self.success_count)
    }

    pub fn last_failure_time(&self) -> Option<Instant> {
        self.last_failure_time
    }

    pub fn try_acquire(
        &mut self,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) -> Option<Admission> {
        if self.state == CircuitState::Open {
            let cooled_down = self
                .last_failure_time
                .map_or(true, |at| at.elapsed() > config.reset_timeout);
            if !cooled_down {
                self.reject(config, events);
                return None;
            }
            self.transition_to(CircuitState::HalfOpen, config, events);
        }

        let probe = match (self.state, config.permitted_calls_in_half_open) {
            (CircuitState::HalfOpen, Some(limit)) => {
                if self.probes_in_flight >= limit {
                    self.reject(config, events);
                    return None;
                }
                self.probes_in_flight += 1;
                true
            }
            _ => false,
        };

        events.push(CircuitBreakerEvent::CallPermitted {
            breaker_name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });
        Some(Admission {
            probe,
            generation: self.half_open_generation,
        })
    }

    /// Returns a half-open slot. Slots from an earlier half-open period
    /// are ignored.
    pub fn release(&mut self, admission: Admission) {
        if admission.probe
            && self.state == CircuitState::HalfOpen
            && admission.generation == self.half_open_generation
        {
            self.probes_in_flight = self.probes_in_flight.saturating_sub(1);
        }
    }

    pub fn record_success(
        &mut self,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        self.success_count += 1;

        events.push(CircuitBreakerEvent::SuccessRecorded {
            breaker_name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "breaker" => config.name.clone(), "outcome" => "success")
            .increment(1);

        match self.state {
            CircuitState::HalfOpen => {
                self.failure_count = 0;
                self.transition_to(CircuitState::Closed, config, events);
            }
            CircuitState::Closed => self.failure_count = 0,
            // A call admitted before the circuit opened; the open timer stands.
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(
        &mut self,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        self.failure_count += 1;
        self.last_failure_time = Some(Instant::now());

        events.push(CircuitBreakerEvent::FailureRecorded {
            breaker_name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
            consecutive_failures: self.failure_count,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "breaker" => config.name.clone(), "outcome" => "failure")
            .increment(1);

        match self.state {
            CircuitState::HalfOpen => self.transition_to(CircuitState::Open, config, events),
            CircuitState::Closed if self.failure_count >= config.max_failures => {
                self.transition_to(CircuitState::Open, config, events)
            }
            _ => {}
        }
    }

    pub fn reset(&mut self, config: &CircuitBreakerConfig, events: &mut Vec<CircuitBreakerEvent>) {
        self.transition_to(CircuitState::Closed, config, events);
        self.failure_count = 0;
        self.success_count = 0;
        self.last_failure_time = None;
    }

    fn reject(&self, config: &CircuitBreakerConfig, events: &mut Vec<CircuitBreakerEvent>) {
        events.push(CircuitBreakerEvent::CallRejected {
            breaker_name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "breaker" => config.name.clone(), "outcome" => "rejected")
            .increment(1);
    }

    fn transition_to(
        &mut self,
        state: CircuitState,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        events.push(CircuitBreakerEvent::StateTransition {
            breaker_name: config.name.clone(),
            timestamp: Instant::now(),
            from_state,
            to_state: state,
        });

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = ?from_state, to = ?state, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "breaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);

            gauge!("circuitbreaker_state", "breaker" => config.name.clone()).set(match state {
                CircuitState::Closed => 0.0,
                CircuitState::HalfOpen => 1.0,
                CircuitState::Open => 2.0,
            });
        }

        self.state = state;
        self.probes_in_flight = 0;
        if state == CircuitState::HalfOpen {
            self.half_open_generation += 1;
        }
    }
}
