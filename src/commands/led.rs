//! Lighting handler.

use anyhow::Context;
use claw_gamepad::{led, ClawDevice, LedState};

use super::CommandResult;
use crate::cli::LedArgs;

/// Build a full lighting state from the arguments and upload it
pub async fn apply(device: &mut ClawDevice, args: LedArgs) -> CommandResult {
    let state = state_from_args(args)?;
    let summary = format!(
        "{} speed={} brightness={} color={}",
        state.effect, state.speed, state.brightness, state.color
    );
    let enabled = state.enabled;
    device
        .set_led_state(state)
        .await
        .context("uploading lighting")?;

    if enabled {
        println!("LED: {summary}");
    } else {
        println!("LED: off");
    }
    Ok(())
}

fn state_from_args(args: LedArgs) -> anyhow::Result<LedState> {
    let defaults = LedState::default();
    let keyframes = match args.keyframes {
        Some(text) => led::parse_keyframes(&text)?,
        None => defaults.keyframes.clone(),
    };
    Ok(LedState {
        enabled: !args.off,
        effect: args.effect.unwrap_or(defaults.effect),
        speed: args.speed.unwrap_or(defaults.speed),
        brightness: args.brightness.unwrap_or(defaults.brightness),
        color: args.color.unwrap_or(defaults.color),
        keyframes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use claw_gamepad::{LedEffect, Rgb};

    #[test]
    fn test_defaults_fill_missing_options() {
        let state = state_from_args(LedArgs {
            effect: Some(LedEffect::Breathe),
            color: Some(Rgb { r: 255, g: 0, b: 0 }),
            ..Default::default()
        })
        .unwrap();
        assert!(state.enabled);
        assert_eq!(state.effect, LedEffect::Breathe);
        assert_eq!(state.speed, LedState::default().speed);
        assert_eq!(state.color.to_string(), "255,0,0");
    }

    #[test]
    fn test_off_and_bad_keyframes() {
        let state = state_from_args(LedArgs {
            off: true,
            ..Default::default()
        })
        .unwrap();
        assert!(!state.enabled);

        assert!(state_from_args(LedArgs {
            keyframes: Some("1,2,3".into()),
            ..Default::default()
        })
        .is_err());
    }
}
