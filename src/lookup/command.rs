//! Lookup tool command construction.

use crate::lookup::types::LookupRequest;

/// A fully built tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Arguments passed to the tool, one flag per element.
    pub args: Vec<String>,
    /// Human-readable command line for logs and responses. Never parsed.
    pub display: String,
}

/// Builds tool invocations from validated requests.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    tool: String,
}

impl CommandBuilder {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    /// Arguments are `@nameserver name TYPE`, then the transport flag, the
    /// DNSSEC pair, `+json` and `+short`, in that order.
    pub fn build(&self, req: &LookupRequest) -> Invocation {
        let mut args = vec![
            format!("@{}", req.nameserver),
            req.name.clone(),
            req.record_type.as_str().to_string(),
        ];

        if let Some(flag) = req.transport.flag() {
            args.push(flag.to_string());
        }
        if req.dnssec {
            args.push("+dnssec".to_string());
            args.push("+do".to_string());
        }
        if req.json {
            args.push("+json".to_string());
        }
        if req.short {
            args.push("+short".to_string());
        }

        let display = std::iter::once(self.tool.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        Invocation { args, display }
    }
}
