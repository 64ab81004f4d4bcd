#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmext_cmake::detect::{check_tools, locate};
use cmext_config::manifest::MANIFEST_FILE;
use cmext_config::{BuildSpec, Manifest, StageLayout};
use cmext_engine::extension::report_test_run;
use cmext_engine::regression::run_regression_tests;
use cmext_engine::{select_generator, CmakeExtension, PackageContext, Phase, Pipeline};

type CliResult = Result<(), Box<dyn Error>>;

/// Environment variable holding a tracing filter, e.g. `cmext_engine=debug`.
const LOG_ENV: &str = "CMEXT_LOG";

#[derive(Debug, Parser)]
#[command(name = "cmext", about = "CMake package builds with dashboard regression tests")]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Configure the build tree with CMake
    Configure {
        #[command(flatten)]
        package: PackageArgs,
    },
    /// Configure and build
    Build {
        #[command(flatten)]
        package: PackageArgs,
    },
    /// Configure, build, install, then run the regression tests
    Install {
        #[command(flatten)]
        package: PackageArgs,
        /// Skip the post-install regression tests
        #[arg(long)]
        skip_tests: bool,
    },
    /// Run the regression tests against an existing build tree
    Test {
        #[command(flatten)]
        package: PackageArgs,
    },
    /// Remove the build tree and stray files in an unmanaged source tree
    Clean {
        #[command(flatten)]
        package: PackageArgs,
    },
    /// Print the CMake generator the package would use
    Generator {
        #[command(flatten)]
        package: PackageArgs,
    },
    /// Check that the tools a build needs are installed
    Doctor {
        #[command(flatten)]
        package: PackageArgs,
    },
}

/// Options shared by every package command. They override `cmext.toml`.
#[derive(Debug, Clone, Default, Args)]
struct PackageArgs {
    /// Source directory (defaults to the current directory)
    #[arg(long)]
    source_dir: Option<PathBuf>,
    /// Build directory, relative to the source directory
    #[arg(long)]
    build_dir: Option<PathBuf>,
    /// Use the Ninja generator
    #[arg(long)]
    ninja: bool,
    /// Treat the source directory as a developer checkout at this path
    #[arg(long)]
    dev_path: Option<PathBuf>,
    /// The package manager owns the source tree; never clean it
    #[arg(long)]
    managed: bool,
    /// Parallel build jobs
    #[arg(long, short = 'j')]
    jobs: Option<u32>,
    /// Installation prefix
    #[arg(long)]
    prefix: Option<PathBuf>,
    /// CMAKE_BUILD_TYPE
    #[arg(long)]
    build_type: Option<String>,
    /// Path to the cmake binary (defaults to PATH lookup)
    #[arg(long)]
    cmake: Option<PathBuf>,
    /// Path to the ctest binary (defaults to PATH lookup)
    #[arg(long)]
    ctest: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Configure { package } => cmd_phase(&package, Phase::Cmake, true),
        Command::Build { package } => cmd_phase(&package, Phase::Build, true),
        Command::Install {
            package,
            skip_tests,
        } => cmd_phase(&package, Phase::Install, !skip_tests),
        Command::Test { package } => cmd_test(&package),
        Command::Clean { package } => cmd_clean(&package),
        Command::Generator { package } => cmd_generator(&package),
        Command::Doctor { package } => cmd_doctor(&package),
    };

    if let Err(msg) = result {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve `cmext.toml` plus command-line overrides into a build context.
fn package_context(args: &PackageArgs) -> Result<PackageContext, Box<dyn Error>> {
    let source_dir = match &args.source_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    if !source_dir.is_dir() {
        return Err(format!("source directory {} does not exist", source_dir.display()).into());
    }

    let mut manifest = Manifest::load_or_default(&source_dir)?;
    if args.ninja {
        manifest.variants.insert("ninja".to_owned(), true);
    }
    if let Some(dev_path) = &args.dev_path {
        manifest
            .parameters
            .insert("dev_path".to_owned(), dev_path.display().to_string());
    }
    if let Some(build_dir) = &args.build_dir {
        manifest.stage.build_dir = build_dir.display().to_string();
    }
    if args.managed {
        manifest.stage.managed = true;
    }
    if let Some(jobs) = args.jobs {
        manifest.config.build_jobs = Some(jobs);
    }

    let mut ctx = PackageContext::from_manifest(&source_dir, &manifest)?;
    if let Some(prefix) = &args.prefix {
        ctx.install_prefix = Some(prefix.clone());
    }
    if let Some(build_type) = &args.build_type {
        ctx.build_type.clone_from(build_type);
    }
    tracing::debug!(
        spec = %ctx.spec,
        build_dir = %ctx.layout.build_dir().display(),
        jobs = ctx.settings.build_jobs,
        "resolved package"
    );
    Ok(ctx)
}

fn resolve_tool(explicit: Option<&PathBuf>, name: &str) -> Result<PathBuf, Box<dyn Error>> {
    match explicit {
        Some(path) => Ok(path.clone()),
        None => Ok(locate(name)?),
    }
}

fn cmd_phase(args: &PackageArgs, last: Phase, run_tests: bool) -> CliResult {
    let start = Instant::now();
    let mut ctx = package_context(args)?;
    ctx.toolchain.cmake = resolve_tool(args.cmake.as_ref(), "cmake")?;
    if last == Phase::Install && run_tests {
        ctx.toolchain.ctest = resolve_tool(args.ctest.as_ref(), "ctest")?;
    }
    for dep in ctx.spec.build_dependencies() {
        if dep != "cmake" {
            locate(dep)?;
        }
    }

    let mut pipeline = Pipeline::new();
    CmakeExtension { run_tests }.register(&mut pipeline);

    eprintln!(
        "    Configuring {} ({})",
        ctx.spec,
        select_generator(&ctx.spec)
    );
    pipeline.run_through(last, &ctx)?;

    eprintln!(
        "    Finished `{last}` for {} in {:.2}s",
        ctx.spec.name(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn cmd_test(args: &PackageArgs) -> CliResult {
    let mut ctx = package_context(args)?;
    ctx.toolchain.ctest = resolve_tool(args.ctest.as_ref(), "ctest")?;

    let outcome = run_regression_tests(&ctx)?;
    report_test_run(&ctx, &outcome);
    Ok(())
}

fn cmd_clean(args: &PackageArgs) -> CliResult {
    let ctx = package_context(args)?;

    let mut pipeline = Pipeline::new();
    CmakeExtension { run_tests: false }.register(&mut pipeline);
    pipeline.run_through(Phase::Clean, &ctx)?;

    eprintln!("    Cleaned {}", ctx.spec.name());
    Ok(())
}

fn cmd_generator(args: &PackageArgs) -> CliResult {
    let ctx = package_context(args)?;
    println!("{}", select_generator(&ctx.spec));
    Ok(())
}

fn cmd_doctor(args: &PackageArgs) -> CliResult {
    eprintln!("Checking environment...");
    eprintln!();

    let mut issues = 0u32;

    let ctx = match package_context(args) {
        Ok(ctx) => {
            let source = ctx.layout.source_dir();
            if source.join(MANIFEST_FILE).exists() {
                eprintln!("  [ok] Package: {}", ctx.spec);
            } else {
                eprintln!("  [ok] Package: {} (no {MANIFEST_FILE}, using defaults)", ctx.spec);
            }
            Some(ctx)
        }
        Err(e) => {
            eprintln!("  [!!] Package: {e}");
            issues = issues.saturating_add(1);
            None
        }
    };

    let spec = ctx
        .as_ref()
        .map_or_else(|| BuildSpec::new("cmake-extension"), |c| c.spec.clone());
    let mut tools = spec.build_dependencies();
    tools.push("ctest");
    for (tool, found) in check_tools(&tools) {
        match found {
            Ok(path) => eprintln!("  [ok] {tool}: {}", path.display()),
            Err(e) => {
                eprintln!("  [!!] {tool}: {e}");
                issues = issues.saturating_add(1);
            }
        }
    }

    if let Some(ctx) = &ctx {
        report_layout(&ctx.layout);
        eprintln!("  [ok] Build jobs: {}", ctx.settings.build_jobs);
    }

    eprintln!();
    if issues == 0 {
        eprintln!("All checks passed.");
        Ok(())
    } else {
        Err(format!("{issues} issue(s) found").into())
    }
}

fn report_layout(layout: &StageLayout) {
    eprintln!("  [ok] Build directory: {}", layout.build_dir().display());
    eprintln!("  [ok] Results directory: {}", layout.results_dir().display());
    let ownership = if layout.is_managed() {
        "managed"
    } else {
        "unmanaged"
    };
    eprintln!("  [ok] Source tree: {ownership}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_install_defaults() {
        let cli = Cli::try_parse_from(["cmext", "install"]).unwrap();
        match cli.command {
            Command::Install {
                package,
                skip_tests,
            } => {
                assert!(!skip_tests);
                assert!(!package.ninja);
                assert!(package.source_dir.is_none());
            }
            other => panic!("expected Install, got {other:?}"),
        }
    }

    #[test]
    fn parse_install_skip_tests_with_overrides() {
        let cli = Cli::try_parse_from([
            "cmext",
            "install",
            "--skip-tests",
            "--ninja",
            "-j",
            "8",
            "--dev-path",
            "/src/nalu-wind",
        ])
        .unwrap();
        match cli.command {
            Command::Install {
                package,
                skip_tests,
            } => {
                assert!(skip_tests);
                assert!(package.ninja);
                assert_eq!(package.jobs, Some(8));
                assert_eq!(package.dev_path, Some(PathBuf::from("/src/nalu-wind")));
            }
            other => panic!("expected Install, got {other:?}"),
        }
    }

    #[test]
    fn parse_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["cmext", "clean", "--verbose", "--managed"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Clean { package } => assert!(package.managed),
            other => panic!("expected Clean, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_non_numeric_jobs() {
        assert!(Cli::try_parse_from(["cmext", "build", "-j", "many"]).is_err());
    }

    #[test]
    fn package_context_applies_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(MANIFEST_FILE),
            "[package]\nname = \"amr-wind\"\n[config]\nbuild_jobs = 2\n",
        )
        .unwrap();
        let args = PackageArgs {
            source_dir: Some(tmp.path().to_path_buf()),
            ninja: true,
            jobs: Some(6),
            build_dir: Some(PathBuf::from("out")),
            ..PackageArgs::default()
        };

        let ctx = package_context(&args).unwrap();
        assert_eq!(ctx.spec.name(), "amr-wind");
        assert!(ctx.spec.variant("ninja"));
        assert_eq!(ctx.settings.build_jobs, 6);
        assert_eq!(ctx.layout.build_dir(), tmp.path().join("out"));
    }

    #[test]
    fn package_context_missing_source_dir() {
        let args = PackageArgs {
            source_dir: Some(PathBuf::from("/nonexistent/cmext/source")),
            ..PackageArgs::default()
        };
        let err = package_context(&args).unwrap_err();
        assert!(err.to_string().contains("does not exist"), "error was: {err}");
    }
}
