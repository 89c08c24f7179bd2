use clap::{Parser, Subcommand};

/// Cromper - sandboxed legacy toolchain runner and instruction differ
#[derive(Parser, Debug)]
#[command(name = "cromper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service backed by a pool of worker processes
    Serve {
        /// Address to listen on (default: CROMPER_BIND or 127.0.0.1:8000)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Number of worker processes (default: CROMPER_WORKER_COUNT or CPU count)
        #[arg(long)]
        workers: Option<usize>,

        /// Run jobs on the service's own threads instead of worker processes
        #[arg(long, default_value = "false")]
        inline: bool,
    },

    /// Worker process: read jobs from stdin, write results to stdout.
    /// Started by `serve`; not meant to be run by hand.
    #[command(hide = true)]
    Worker,

    /// Compile a source file with one toolchain
    Compile {
        /// Compiler id (see `cromper catalog`)
        #[arg(long, short = 'c')]
        compiler: String,

        /// Source file, or "-" for stdin
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Compiler flags as one string
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        flags: String,

        /// Context file compiled ahead of the source
        #[arg(long, value_name = "FILE")]
        context: Option<String>,

        /// Function name passed to diff-aware toolchains
        #[arg(long)]
        function: Option<String>,

        /// Library as name@version (repeatable)
        #[arg(long = "library", value_name = "NAME@VERSION")]
        libraries: Vec<String>,

        /// Where to write the object file (default: <SOURCE>.o)
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<String>,
    },

    /// Assemble target assembly for a platform
    Assemble {
        /// Platform id
        #[arg(long, short = 'p')]
        platform: String,

        /// Assembly file, or "-" for stdin
        #[arg(value_name = "ASM")]
        asm: String,

        /// Where to write the object file (default: <ASM>.o)
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<String>,
    },

    /// Diff a compiled object against a target object and print the scored rows
    Diff {
        /// Platform id
        #[arg(long, short = 'p')]
        platform: String,

        /// Target (reference) object
        #[arg(value_name = "TARGET")]
        target: String,

        /// Candidate object
        #[arg(value_name = "COMPILED")]
        compiled: String,

        /// Function symbol to disassemble
        #[arg(long)]
        label: Option<String>,

        /// Diff flag, e.g. -DIFFdifflib or -Mreg-names=32 (repeatable)
        #[arg(long = "flag", value_name = "FLAG", allow_hyphen_values = true)]
        flags: Vec<String>,

        /// Print only the score summary
        #[arg(long, default_value = "false")]
        summary: bool,
    },

    /// List platforms and compilers
    Catalog {
        /// Only compilers for this platform
        #[arg(long, short = 'p')]
        platform: Option<String>,

        /// Include compilers that are not provisioned on this host
        #[arg(long, default_value = "false")]
        all: bool,
    },
}
