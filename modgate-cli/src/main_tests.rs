use super::*;
use chrono::Utc;
use modgate::contracts::{ContractExtractor, ModuleContract};
use modgate::core::{FatalRecord, ModuleReport, RunReport, SkipReason, StageName, StageOutcome};
use modgate::suite::ModuleUnderTest;
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn report(modules: Vec<ModuleReport>) -> RunReport {
    RunReport {
        run_id: Uuid::new_v4(),
        started_at: Utc::now(),
        finished_at: Utc::now(),
        modules,
    }
}

#[test]
fn test_cli_parses_run_flags() {
    let cli = Cli::try_parse_from([
        "modgate",
        "--log-format",
        "json",
        "run",
        "--module",
        "VLAN",
        "--parallel",
        "2",
        "--timeout-secs",
        "0",
        "--json",
    ])
    .unwrap();

    assert_eq!(cli.log_format, LogFormat::Json);
    let Command::Run(args) = cli.command else {
        panic!("expected run");
    };
    assert_eq!(args.module.as_deref(), Some("VLAN"));
    assert_eq!(args.parallel, Some(2));
    assert_eq!(args.timeout_secs, Some(0));
    assert!(args.suite.json);
}

#[test]
fn test_cli_parses_extract() {
    let cli = Cli::try_parse_from(["modgate", "extract", "dns", "--modules-root", "/srv/modules"])
        .unwrap();
    let Command::Extract { module, suite } = cli.command else {
        panic!("expected extract");
    };
    assert_eq!(module, "dns");
    assert_eq!(suite.modules_root, Some(PathBuf::from("/srv/modules")));
}

#[test]
fn test_module_filter() {
    assert_eq!(module_filter(Some("VLAN")), Some("vlan".to_string()));
    assert_eq!(module_filter(Some("all")), None);
    assert_eq!(module_filter(Some("ALL")), None);
    assert_eq!(module_filter(Some("  ")), None);
    assert_eq!(module_filter(None), None);
}

#[test]
fn test_render_run_report() {
    let run = report(vec![
        ModuleReport::completed(
            "vlan",
            vec![
                StageOutcome::passed(StageName::Structure),
                StageOutcome::failed(
                    StageName::Syntax,
                    vec!["Command 'validate' failed: exit status 1\nOutput: boom".to_string()],
                ),
                StageOutcome::skipped(
                    StageName::Apply,
                    SkipReason::MissingOptIn {
                        flag: "USE_REAL_ROUTER".to_string(),
                    },
                ),
            ],
        ),
        ModuleReport::fatal(
            "dns",
            FatalRecord {
                stage: StageName::Structure,
                kind: "module_not_found".to_string(),
                message: "Module directory does not exist: /x/dns".to_string(),
            },
        ),
    ]);

    let text = render::run_report(&run);
    assert!(text.starts_with("MODULE"));
    assert!(text.contains("PASS"));
    assert!(text.contains("- Command 'validate' failed: exit status 1 | Output: boom"));
    assert!(text.contains("USE_REAL_ROUTER != true"));
    assert!(text.contains("FATAL"));
    assert!(text.contains("structure (module_not_found)"));
    assert!(text.ends_with("1 passed, 1 failed, 1 skipped, 1 fatal, 0 cleanup failure(s)\n"));
}

#[test]
fn test_render_extraction() {
    let contract = ModuleContract::new("ntp", ["servers"], ["timezone"], ["ntp_servers"]).unwrap();
    let module = ModuleUnderTest::new("ntp", "/modules/ntp", contract.clone());
    let inputs = ContractExtractor::inputs().unwrap().extract(
        "variable \"servers\" {}\nvariable \"timezone\" {\n  default = \"UTC\"\n}\nvariable \"extra\" {}\n",
    );
    let report = validate_contract(&contract, Some(&inputs), None);

    let text = render::extraction(&module, Some(&inputs), None, &report);
    assert!(text.contains("inputs:  extra, servers, timezone (default)"));
    assert!(text.contains("outputs: (file not found)"));
    assert!(text.contains("contract: 1 violation(s)"));
    assert!(text.contains("Undocumented inputs found: extra"));
}
