use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "steward", version, about = "Steward configuration compliance CLI")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, global = true, help = "Path to an alternate config file")]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Log filter (tracing EnvFilter syntax), overridden by RUST_LOG"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile the service-account audit configuration into one descriptor.
    Compile {
        #[arg(long, help = "Service account to audit on the target node")]
        account: String,
        #[arg(long, default_value = "localhost")]
        node: String,
        #[arg(long, default_value = "ServiceAccountAudit")]
        name: String,
        #[arg(long, value_enum, default_value_t = EnsureState::Present)]
        ensure: EnsureState,
        #[arg(long, default_value_t = true, help = "Audit that the account is enabled")]
        require_enabled: bool,
        #[arg(long, default_value = "./output")]
        out: PathBuf,
    },
    Package {
        #[command(subcommand)]
        command: PackageCommands,
    },
    /// Test or apply a folder of compiled descriptors on this host.
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    Tools {
        #[command(subcommand)]
        command: ToolCommands,
    },
    Doctor,
    /// Upload a package archive to object storage.
    Publish {
        #[arg(long)]
        package: PathBuf,
        #[arg(long)]
        container: String,
        #[arg(long, help = "Storage account (defaults to the configured account)")]
        account: Option<String>,
        #[arg(long, help = "Blob name (defaults to the archive file name)")]
        blob: Option<String>,
        #[arg(long, help = "Mint a read-only access URL valid for this many days")]
        read_access_days: Option<u32>,
    },
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },
    Compliance {
        #[command(subcommand)]
        command: ComplianceCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum PackageCommands {
    Create {
        #[arg(long)]
        descriptor: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "1.0.0")]
        version: String,
        #[arg(long, value_enum, default_value_t = AssignmentType::Audit)]
        assignment_type: AssignmentType,
        #[arg(long, default_value = "./packages")]
        out: PathBuf,
        #[arg(long, default_value_t = false, help = "Replace an existing archive")]
        force: bool,
    },
    Test {
        #[arg(long)]
        package: PathBuf,
        #[arg(long, help = "Package name (defaults from the archive file name)")]
        name: Option<String>,
        #[arg(long, help = "Package version (defaults from the archive file name)")]
        version: Option<String>,
        #[arg(
            long,
            help = "Configuration parameter as key=value",
            value_name = "KEY=VALUE"
        )]
        parameter: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StateCommands {
    Test {
        #[arg(long, default_value = "./output")]
        folder: PathBuf,
    },
    Apply {
        #[arg(long, default_value = "./output")]
        folder: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Clear cached extractions of a package from every installed engine version.
    Clear {
        #[arg(long)]
        name: String,
        #[arg(long)]
        version: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ToolCommands {
    Ensure {
        #[arg(long)]
        name: String,
        #[arg(long, help = "Lowest acceptable version")]
        min_version: Option<String>,
        #[arg(long, help = "Exact pinned version (wins over --min-version)")]
        exact_version: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Generate a policy definition document referencing a published package.
    Generate {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "1.0.0")]
        version: String,
        #[arg(long)]
        content_uri: String,
        #[arg(long)]
        content_hash: String,
        #[arg(long)]
        display_name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_enum, default_value_t = EnforcementMode::Audit)]
        mode: EnforcementMode,
        #[arg(long, default_value = "./policies")]
        out: PathBuf,
    },
    Register {
        #[arg(long)]
        definition: PathBuf,
    },
    Assign {
        #[arg(long)]
        definition_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        scope: String,
        #[arg(long, value_enum, default_value_t = IdentityMode::SystemAssigned)]
        identity: IdentityMode,
        #[arg(long, value_enum, default_value_t = AssignmentEnforcement::Default)]
        enforcement: AssignmentEnforcement,
    },
}

#[derive(Subcommand, Debug)]
pub enum ComplianceCommands {
    /// Time-ordered compliance records for one assignment.
    Status {
        #[arg(long)]
        assignment: String,
        #[arg(long)]
        scope: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Aggregate non-compliance summary via the resource-graph service.
    Summary {
        #[arg(long, help = "Override the default aggregation query")]
        query: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnsureState {
    Present,
    Absent,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentType {
    Audit,
    AuditAndSet,
}

impl AssignmentType {
    pub fn metaconfig_value(&self) -> &'static str {
        match self {
            AssignmentType::Audit => "Audit",
            AssignmentType::AuditAndSet => "AuditAndSet",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    Audit,
    ApplyAndAutoCorrect,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    None,
    SystemAssigned,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentEnforcement {
    Default,
    DoNotEnforce,
}
