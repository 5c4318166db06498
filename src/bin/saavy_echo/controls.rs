//! Keyboard controls. Raw-mode terminal, one key per action; every state
//! change the session publishes is printed as a line.

use std::io::{self, Write};
use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal,
};

use saavy_echo::{
    graph::Topology,
    session::{ContextProvider, EchoSession, MediaSource, StateChange},
    EchoError, MAX_DELAY_TIME, MAX_REPEATS,
};

const DELAY_STEP: f32 = 0.5;
const MIN_DELAY: f32 = 0.1;
const GAIN_STEP: f32 = 0.1;
const MAX_GAIN: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Toggle,
    Delay(f32),
    Repeats(i32),
    Gain(f32),
    CycleTopology,
    Quit,
}

fn action_for(code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::Toggle),
        KeyCode::Up => Some(Action::Delay(DELAY_STEP)),
        KeyCode::Down => Some(Action::Delay(-DELAY_STEP)),
        KeyCode::Right => Some(Action::Repeats(1)),
        KeyCode::Left => Some(Action::Repeats(-1)),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::Gain(GAIN_STEP)),
        KeyCode::Char('-') => Some(Action::Gain(-GAIN_STEP)),
        KeyCode::Char('t') => Some(Action::CycleTopology),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

fn next_topology(topology: Topology) -> Topology {
    match topology {
        Topology::SingleChain => Topology::PerRepeat,
        Topology::PerRepeat => Topology::SingleChain,
    }
}

/// Run the key loop until quit. Restores the terminal on the way out.
pub fn run<M, P>(session: &mut EchoSession<M, P>) -> EyreResult<()>
where
    M: MediaSource,
    P: ContextProvider<M::Capture>,
{
    session.subscribe(|change: &StateChange| {
        print!("{change}\r\n");
        let _ = io::stdout().flush();
    });

    println!("space: start/stop   up/down: delay   left/right: repeats");
    println!("+/-: gain   t: topology   q: quit");
    println!();

    terminal::enable_raw_mode()?;
    let result = event_loop(session);
    terminal::disable_raw_mode()?;

    session.stop()?;
    result
}

fn event_loop<M, P>(session: &mut EchoSession<M, P>) -> EyreResult<()>
where
    M: MediaSource,
    P: ContextProvider<M::Capture>,
{
    loop {
        if let Err(err) = session.poll_start() {
            print!("error: {err}\r\n");
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = action_for(key.code, key.modifiers) else {
            continue;
        };
        if action == Action::Quit {
            return Ok(());
        }
        if let Err(err) = apply(session, action) {
            print!("error: {err}\r\n");
        }
        io::stdout().flush()?;
    }
}

fn apply<M, P>(session: &mut EchoSession<M, P>, action: Action) -> Result<(), EchoError>
where
    M: MediaSource,
    P: ContextProvider<M::Capture>,
{
    let config = *session.config();
    match action {
        Action::Toggle => session.toggle(),
        Action::Delay(step) => {
            session.set_delay_time((config.delay_time + step).clamp(MIN_DELAY, MAX_DELAY_TIME))
        }
        Action::Repeats(step) => {
            let repeats = (config.repeat_count as i32 + step).clamp(1, MAX_REPEATS as i32);
            session.set_repeat_count(repeats as usize)
        }
        Action::Gain(step) => session.set_gain((config.output_gain + step).clamp(0.0, MAX_GAIN)),
        Action::CycleTopology => session.set_topology(next_topology(config.topology)),
        Action::Quit => Ok(()),
    }
}
