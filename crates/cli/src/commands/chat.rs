use std::io::{self, BufRead, Write};
use std::sync::Arc;

use kitfinder_agent::{build_llm_client, AssistantRuntime};
use kitfinder_core::audit::TracingAuditSink;
use kitfinder_core::service::ConversationService;
use kitfinder_core::session::SessionId;
use tokio::runtime::Runtime;

use crate::commands::{runtime, CommandContext, CommandResult, EXIT_CONFIG};

const QUIT: &str = "/quit";
const RESET: &str = "/reset";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    pub turns: usize,
    pub resets: usize,
    pub failures: usize,
}

/// Interactive loop over stdin against one local session.
pub fn run(demo: bool) -> CommandResult {
    let context = match CommandContext::load("chat", demo) {
        Ok(context) => context,
        Err(result) => return result,
    };
    let runtime = match runtime("chat") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let assistant = match assistant(&context) {
        Ok(assistant) => assistant,
        Err(result) => return result,
    };

    let session_id = SessionId::generate();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let _ = writeln!(
        stdout,
        "kitfinder chat ({} catalog). Type {RESET} to start over, {QUIT} to leave.",
        if context.demo { "demo" } else { "live" }
    );

    match converse(&runtime, &assistant, &session_id, stdin.lock(), &mut stdout) {
        Ok(transcript) => CommandResult::success(
            "chat",
            format!(
                "session {session_id} ended after {} turns ({} resets, {} failures)",
                transcript.turns, transcript.resets, transcript.failures
            ),
        ),
        Err(error) => CommandResult::failure("chat", "io", error.to_string(), 1),
    }
}

pub fn assistant(context: &CommandContext) -> Result<AssistantRuntime, CommandResult> {
    let catalog = Arc::new(context.catalog());
    let conversations = Arc::new(ConversationService::from_config(
        catalog,
        &context.config,
        Arc::new(TracingAuditSink),
    ));
    let llm = build_llm_client(&context.config.llm).map_err(|error| {
        CommandResult::failure("chat", "llm_client", format!("{error:#}"), EXIT_CONFIG)
    })?;
    Ok(AssistantRuntime::new(conversations, llm))
}

pub fn converse<R, W>(
    runtime: &Runtime,
    assistant: &AssistantRuntime,
    session_id: &SessionId,
    input: R,
    output: &mut W,
) -> io::Result<Transcript>
where
    R: BufRead,
    W: Write,
{
    let mut transcript = Transcript::default();
    for line in input.lines() {
        let line = line?;
        let message = line.trim();
        match message {
            "" => continue,
            QUIT => break,
            RESET => {
                runtime.block_on(assistant.reset(session_id));
                transcript.resets += 1;
                writeln!(output, "Conversation reset. Which car model and year?")?;
            }
            _ => match runtime.block_on(assistant.respond(session_id, message)) {
                Ok(reply) => {
                    transcript.turns += 1;
                    writeln!(output, "{}", reply.response)?;
                }
                Err(error) => {
                    transcript.failures += 1;
                    writeln!(output, "error: {error}")?;
                }
            },
        }
        output.flush()?;
    }
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use kitfinder_core::catalog::fixtures::demo_source;
    use kitfinder_core::config::AppConfig;
    use kitfinder_core::session::SessionId;

    use crate::commands::chat::{assistant, converse, Transcript};
    use crate::commands::{runtime, CommandContext};

    #[test]
    fn scripted_conversation_reaches_products_and_stops_at_quit() {
        let context = CommandContext {
            config: AppConfig::default(),
            source: Arc::new(demo_source()),
            demo: true,
        };
        let runtime = runtime("chat").expect("runtime");
        let assistant = assistant(&context).expect("assistant");
        let script = "creta 2024\n\ninteriors\nmats\n/reset\n/quit\nvenue\n";
        let mut output = Vec::new();

        let transcript = converse(
            &runtime,
            &assistant,
            &SessionId::from("cli"),
            Cursor::new(script),
            &mut output,
        )
        .expect("conversation runs");

        assert_eq!(transcript, Transcript { turns: 3, resets: 1, failures: 0 });
        let printed = String::from_utf8(output).expect("utf8");
        assert!(printed.contains("Here are the Mats accessories in Interiors category for CRETA"));
        assert!(printed.ends_with("Conversation reset. Which car model and year?\n"));
    }
}
