//! Human-readable error descriptions and structured JSON error formatting.

use serde_json::json;
use trigger_core::error::{BuildError, DecoderError};
use trigger_hardware::HwError;

/// Every message in the report's chain, outermost first.
fn chain_text(err: &eyre::Report) -> Vec<String> {
    err.chain().map(ToString::to_string).collect()
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingWheel => {
                "What happened: No wheel pattern was given to the decoder.\nLikely causes: The builder was used without with_wheel(...) or a [wheel] config.\nHow to fix: Configure a missing_tooth or dual_wheel pattern.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: The decoder rejected the wheel setup ({msg}).\nLikely causes: Tooth count, missing teeth or RPM limits out of range.\nHow to fix: Edit [wheel] and [engine] in the config, then rerun."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DecoderError>() {
        return match de {
            DecoderError::TooManyEndAngles { given, channels } => format!(
                "What happened: {given} ignition end angles were given but only {channels} channels are configured.\nHow to fix: Pass at most {channels} --angle values or raise engine.ignition_channels."
            ),
            DecoderError::ChannelOutOfRange(ch, max) => format!(
                "What happened: Ignition channel {ch} does not exist.\nHow to fix: Use a channel in 1..={max}."
            ),
            DecoderError::Disconnected => {
                "What happened: The edge pump stopped before all edges were sent.\nLikely causes: The decoder thread exited early.\nHow to fix: Re-run with --log-level=debug for details.".to_string()
            }
        };
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return match he {
            HwError::InvalidSim(msg) => format!(
                "What happened: The simulated wheel cannot be generated ({msg}).\nHow to fix: Adjust --rpm or the [wheel] section."
            ),
            HwError::Gpio(msg) => format!(
                "What happened: Failed to open trigger input pins ({msg}).\nLikely causes: Wrong pin numbers or insufficient GPIO permissions.\nHow to fix: Check the pin numbers and that the process may access GPIO."
            ),
        };
    }

    let chain = chain_text(err);
    let all = chain.join(": ");
    let lower = all.to_ascii_lowercase();

    if lower.contains("edge trace csv must have headers") {
        return "Invalid headers in edge trace CSV. Expected 'input,time_us'.".to_string();
    }

    if lower.contains("invalid configuration") {
        let detail = chain.last().map_or("", String::as_str);
        return format!(
            "What happened: Configuration is invalid ({detail}).\nLikely causes: Out-of-range or inconsistent values in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nDetails: {all}\nHow to fix: Check section and key names against the sample config."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nDetails: {all}\nHow to fix: Check the --config path and file permissions."
        );
    }

    if lower.contains("self-check failed") {
        return format!(
            "What happened: {all}.\nHow to fix: Check [wheel] and [engine] against the installed trigger wheel."
        );
    }

    format!(
        "Something went wrong: {all}\nHow to fix: Re-run with --log-level=debug for details."
    )
}

/// Stable exit codes per error family; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    if err.downcast_ref::<DecoderError>().is_some() {
        return 4;
    }
    if err.downcast_ref::<HwError>().is_some() {
        return 5;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        "BuildError"
    } else if err.downcast_ref::<DecoderError>().is_some() {
        "DecoderError"
    } else if err.downcast_ref::<HwError>().is_some() {
        "HardwareError"
    } else {
        "Error"
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_errors_get_their_own_exit_code() {
        let err = eyre::Report::new(DecoderError::TooManyEndAngles {
            given: 5,
            channels: 4,
        });
        assert_eq!(exit_code_for_error(&err), 4);
        assert!(humanize(&err).contains("only 4 channels"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).expect("json");
        assert_eq!(v["reason"], "DecoderError");
    }

    #[test]
    fn csv_header_message_is_found_through_context() {
        let err = eyre::eyre!("edge trace CSV must have headers 'input,time_us', got: a,b")
            .wrap_err("load edge trace trace.csv");
        assert_eq!(
            humanize(&err),
            "Invalid headers in edge trace CSV. Expected 'input,time_us'."
        );
        assert_eq!(exit_code_for_error(&err), 1);
    }

    #[test]
    fn config_message_names_the_failing_key() {
        let err = eyre::eyre!("wheel.teeth must be > 0").wrap_err("invalid configuration");
        assert!(humanize(&err).contains("wheel.teeth must be > 0"));
    }
}
