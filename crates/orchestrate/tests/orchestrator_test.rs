//! End-to-end orchestrator tests against a scripted in-memory chain.
//!
//! Each test drives the real deploy and wiring executors with a mock
//! [`ChainClient`] whose failures are scripted per component or per
//! method, and asserts on both the run report and the mock's call log.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use alloy_core::primitives::{Address, B256, U256};
use anyhow::Result;
use tempdir::TempDir;

use wireup_orchestrate::{
    AddressRegistry, ArgSpec, ArgValue, ChainClient, ChainError, ComponentDescriptor, Environment,
    InsufficientFunds, Manifest, Precondition, RunReport, StepKind, StepStatus, WireTarget,
    WiringEdge, run_deploy_phase,
    run_wiring_phase,
};

const SENDER: Address = Address::repeat_byte(0xEE);

#[derive(Default)]
struct MockState {
    counter: u8,
    deploys: Vec<String>,
    sends: Vec<String>,
    fail_deploys: BTreeSet<String>,
    fail_sends: BTreeSet<String>,
    balances: BTreeMap<Address, U256>,
    views: BTreeMap<String, B256>,
}

/// Scripted chain double: deterministic addresses, per-name deploy
/// failures, per-method send failures, fixed view answers.
#[derive(Default)]
struct MockChain(Mutex<MockState>);

impl MockChain {
    fn fail_deploy(&self, component: &str) {
        self.0.lock().unwrap().fail_deploys.insert(component.to_string());
    }

    fn fail_send(&self, method: &str) {
        self.0.lock().unwrap().fail_sends.insert(method.to_string());
    }

    fn clear_send_failures(&self) {
        self.0.lock().unwrap().fail_sends.clear();
    }

    fn set_balance(&self, account: Address, wei: U256) {
        self.0.lock().unwrap().balances.insert(account, wei);
    }

    fn set_view(&self, method: &str, word: B256) {
        self.0.lock().unwrap().views.insert(method.to_string(), word);
    }

    fn deploys(&self) -> Vec<String> {
        self.0.lock().unwrap().deploys.clone()
    }

    fn sends(&self) -> Vec<String> {
        self.0.lock().unwrap().sends.clone()
    }
}

impl ChainClient for MockChain {
    async fn deploy(
        &self,
        component: &str,
        _args: &[ArgValue],
        _value: U256,
        _sender: Address,
    ) -> Result<Address, ChainError> {
        let mut state = self.0.lock().unwrap();
        if state.fail_deploys.contains(component) {
            return Err(ChainError::Reverted(format!(
                "constructor of {} reverted",
                component
            )));
        }
        state.counter += 1;
        state.deploys.push(component.to_string());
        Ok(Address::repeat_byte(state.counter))
    }

    async fn send(
        &self,
        _target: Address,
        method: &str,
        _args: &[ArgValue],
        _sender: Address,
    ) -> Result<(), ChainError> {
        let mut state = self.0.lock().unwrap();
        state.sends.push(method.to_string());
        if state.fail_sends.contains(method) {
            return Err(ChainError::Reverted(format!("{} reverted", method)));
        }
        Ok(())
    }

    async fn view(
        &self,
        _target: Address,
        method: &str,
        _args: &[ArgValue],
    ) -> Result<B256, ChainError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .views
            .get(method)
            .copied()
            .unwrap_or(B256::ZERO))
    }

    async fn balance(&self, account: Address) -> Result<U256, ChainError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .balances
            .get(&account)
            .copied()
            .unwrap_or(U256::MAX))
    }
}

/// Common scratch setup: one environment in a temp directory.
struct TestContext {
    _tmp: TempDir,
    env: Environment,
}

impl TestContext {
    fn new() -> Self {
        let tmp = TempDir::new("wireup-test").expect("temp dir");
        let env = Environment::new(
            "testnet",
            1337,
            "http://127.0.0.1:8545",
            SENDER,
            tmp.path().join("build/contracts"),
            tmp.path().join("out"),
        )
        .expect("environment");
        Self { _tmp: tmp, env }
    }

    fn registry(&self, manifest: &Manifest, redeploy: bool) -> Result<AddressRegistry> {
        AddressRegistry::load_or_create(&self.env, &manifest.fingerprint()?, redeploy)
    }

    fn report(&self) -> Result<RunReport> {
        RunReport::load_or_create(&self.env.report_path(), &self.env.network)
    }
}

fn component(name: &str, refs: &[&str]) -> ComponentDescriptor {
    ComponentDescriptor {
        name: name.to_string(),
        args: refs
            .iter()
            .map(|r| ArgSpec::Ref {
                component: r.to_string(),
            })
            .collect(),
        requires_value: None,
    }
}

fn edge(from: &str, to: &str, method: &str) -> WiringEdge {
    WiringEdge {
        from: from.to_string(),
        to: WireTarget::Component(to.to_string()),
        method: method.to_string(),
        check: None,
        precondition: None,
    }
}

/// The supply-chain shape from the reference deployment: RM at the
/// root, CTM carrying capital, WSOM/COM wired after the fact.
fn supply_chain_manifest() -> Manifest {
    Manifest {
        components: vec![
            component("RM", &[]),
            component("IBM", &["RM"]),
            component("SM", &["RM", "IBM"]),
            ComponentDescriptor {
                requires_value: Some(U256::from(10u64)),
                ..component("CTM", &["RM", "IBM", "SM"])
            },
            component("WIM", &["RM", "IBM"]),
            component("WSOM", &["RM", "IBM", "SM", "CTM"]),
            component("COM", &["RM", "IBM", "CTM"]),
        ],
        wires: vec![
            edge("CTM", "WSOM", "setWarehouseSupplierOrderManagementAddress"),
            edge("CTM", "COM", "setCustomerOrderManagementAddress"),
            edge("WSOM", "WIM", "setWarehouseInventoryManagementAddress"),
        ],
    }
}

#[tokio::test]
async fn test_full_run_deploys_in_order_and_wires_everything() -> Result<()> {
    let ctx = TestContext::new();
    let manifest = supply_chain_manifest();
    let chain = MockChain::default();

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;

    let deploys = run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;
    assert_eq!(deploys.succeeded, 7);
    assert_eq!(deploys.failed, 0);
    assert_eq!(
        chain.deploys(),
        vec!["RM", "IBM", "SM", "CTM", "WIM", "WSOM", "COM"]
    );
    assert_eq!(registry.len(), 7);

    let wires = run_wiring_phase(&manifest, &ctx.env, &chain, &registry, &mut report).await?;
    assert_eq!(wires.succeeded, 3);
    assert_eq!(wires.failed, 0);
    assert_eq!(chain.sends().len(), 3);

    // Both artifacts were persisted.
    assert!(ctx.env.registry_path().exists());
    assert!(ctx.env.report_path().exists());
    assert!(!report.has_failures());
    Ok(())
}

#[tokio::test]
async fn test_rerun_skips_recorded_deploys_without_chain_calls() -> Result<()> {
    let ctx = TestContext::new();
    let manifest = supply_chain_manifest();
    let chain = MockChain::default();

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;
    let calls_after_first = chain.deploys().len();

    // Resume from disk, as a second invocation would.
    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    let second = run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    assert_eq!(second.skipped, 7);
    assert_eq!(second.succeeded, 0);
    assert_eq!(chain.deploys().len(), calls_after_first);
    Ok(())
}

#[tokio::test]
async fn test_redeploy_starts_from_an_empty_registry() -> Result<()> {
    let ctx = TestContext::new();
    let manifest = supply_chain_manifest();
    let chain = MockChain::default();

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    let mut registry = ctx.registry(&manifest, true)?;
    let mut report = RunReport::new(&ctx.env.network);
    let second = run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    assert_eq!(second.succeeded, 7);
    assert_eq!(chain.deploys().len(), 14);
    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_fails_fast_with_no_registry_write() -> Result<()> {
    let ctx = TestContext::new();
    let manifest = supply_chain_manifest();
    let chain = MockChain::default();
    // CTM requires 10 wei; the sender only holds 5.
    chain.set_balance(SENDER, U256::from(5u64));

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    let outcome = run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    let ctm = report.steps.iter().find(|s| s.target == "CTM").unwrap();
    assert_eq!(ctm.status, StepStatus::Failed);
    let cause = InsufficientFunds {
        sender: SENDER,
        required: U256::from(10u64),
        available: U256::from(5u64),
    };
    assert_eq!(ctm.detail, cause.to_string());
    assert!(!registry.contains("CTM"));
    // The deploy call was never attempted.
    assert!(!chain.deploys().contains(&"CTM".to_string()));

    // CTM's dependents are blocked, the independent WIM branch is not.
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.skipped, 2); // WSOM, COM
    assert!(registry.contains("WIM"));
    Ok(())
}

#[tokio::test]
async fn test_failed_deploy_blocks_transitive_dependents_only() -> Result<()> {
    let ctx = TestContext::new();
    let manifest = supply_chain_manifest();
    let chain = MockChain::default();
    chain.fail_deploy("SM");

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    let outcome = run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    assert_eq!(outcome.failed, 1); // SM
    // CTM references SM; WSOM references CTM; COM references CTM.
    for blocked in ["CTM", "WSOM", "COM"] {
        let step = report.steps.iter().find(|s| s.target == blocked).unwrap();
        assert_eq!(step.status, StepStatus::Skipped, "{} should be blocked", blocked);
        assert!(!registry.contains(blocked));
    }
    // Independent branch keeps going.
    for deployed in ["RM", "IBM", "WIM"] {
        assert!(registry.contains(deployed), "{} should deploy", deployed);
    }
    Ok(())
}

#[tokio::test]
async fn test_wiring_rerun_reattempts_only_failed_edges() -> Result<()> {
    let ctx = TestContext::new();
    let manifest = supply_chain_manifest();
    let chain = MockChain::default();
    chain.fail_send("setCustomerOrderManagementAddress");

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    let first = run_wiring_phase(&manifest, &ctx.env, &chain, &registry, &mut report).await?;
    assert_eq!(first.succeeded, 2);
    assert_eq!(first.failed, 1);

    // Operator fixes the underlying cause and re-runs the phase.
    chain.clear_send_failures();
    let sends_before = chain.sends().len();

    let mut report = ctx.report()?;
    let second = run_wiring_phase(&manifest, &ctx.env, &chain, &registry, &mut report).await?;
    assert_eq!(second.succeeded, 3);
    assert_eq!(second.failed, 0);

    // Exactly one setter was re-invoked: the previously failed edge.
    let new_sends = &chain.sends()[sends_before..];
    assert_eq!(new_sends, ["setCustomerOrderManagementAddress"]);
    Ok(())
}

#[tokio::test]
async fn test_wiring_fix_does_not_invalidate_recorded_addresses() -> Result<()> {
    let ctx = TestContext::new();
    let mut manifest = supply_chain_manifest();
    let chain = MockChain::default();
    chain.fail_send("setWarehouseSupplierOrderManagementAddress");

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;
    let first = run_wiring_phase(&manifest, &ctx.env, &chain, &registry, &mut report).await?;
    assert_eq!(first.failed, 1);

    // The failure was a wrong setter name in the manifest; the
    // operator corrects the edge and re-runs the wiring phase. The
    // recorded addresses stay valid, so no redeploy is needed.
    manifest.wires[0].method = "setWarehouseSupplierOrderManagement".to_string();

    let registry = ctx.registry(&manifest, false)?;
    assert_eq!(registry.len(), 7);

    let mut report = ctx.report()?;
    let second = run_wiring_phase(&manifest, &ctx.env, &chain, &registry, &mut report).await?;
    assert_eq!(second.failed, 0);
    assert!(chain.sends().contains(&"setWarehouseSupplierOrderManagement".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_undeployed_target_fails_edge_but_not_the_phase() -> Result<()> {
    let ctx = TestContext::new();
    let manifest = supply_chain_manifest();
    let chain = MockChain::default();
    chain.fail_deploy("WIM");

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    let outcome = run_wiring_phase(&manifest, &ctx.env, &chain, &registry, &mut report).await?;
    assert_eq!(outcome.succeeded, 2); // CTM -> WSOM, CTM -> COM
    assert_eq!(outcome.failed, 1);

    let failed = report
        .steps
        .iter()
        .find(|s| s.kind == StepKind::Wire && s.status == StepStatus::Failed)
        .unwrap();
    assert!(failed.target.starts_with("WSOM -> WIM"));
    assert!(failed.detail.contains("unresolved dependency"));
    assert!(failed.detail.contains("WIM"));
    Ok(())
}

#[tokio::test]
async fn test_unmet_precondition_skips_edge_and_spares_the_rest() -> Result<()> {
    let ctx = TestContext::new();
    let mut manifest = supply_chain_manifest();
    manifest.wires.insert(
        0,
        WiringEdge {
            from: "CTM".to_string(),
            to: WireTarget::Account(Address::repeat_byte(0x42)),
            method: "setInitialFinanceDirector".to_string(),
            check: None,
            precondition: Some(Precondition {
                component: "RM".to_string(),
                method: "hasRole".to_string(),
                args: vec![
                    ArgValue::Word(B256::repeat_byte(0xAA)),
                    ArgValue::Address(Address::repeat_byte(0x42)),
                ],
                expect: ArgValue::Bool(true),
                hint: Some("grant the finance director role, then re-run".to_string()),
            }),
        },
    );

    let chain = MockChain::default();
    // hasRole answers false (the all-zero word).
    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    let outcome = run_wiring_phase(&manifest, &ctx.env, &chain, &registry, &mut report).await?;
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.succeeded, 3);
    assert_eq!(outcome.failed, 0);

    let skipped = report
        .steps
        .iter()
        .find(|s| s.status == StepStatus::Skipped)
        .unwrap();
    assert!(skipped.detail.contains("precondition unmet"));
    assert!(skipped.detail.contains("grant the finance director role"));
    // The gated setter was never invoked.
    assert!(!chain.sends().contains(&"setInitialFinanceDirector".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_met_precondition_lets_the_edge_run() -> Result<()> {
    let ctx = TestContext::new();
    let mut manifest = supply_chain_manifest();
    manifest.wires.truncate(0);
    manifest.wires.push(WiringEdge {
        from: "CTM".to_string(),
        to: WireTarget::Account(Address::repeat_byte(0x42)),
        method: "setInitialFinanceDirector".to_string(),
        check: None,
        precondition: Some(Precondition {
            component: "RM".to_string(),
            method: "hasRole".to_string(),
            args: vec![],
            expect: ArgValue::Bool(true),
            hint: None,
        }),
    });

    let chain = MockChain::default();
    chain.set_view("hasRole", B256::left_padding_from(&[1]));

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    let outcome = run_wiring_phase(&manifest, &ctx.env, &chain, &registry, &mut report).await?;
    assert_eq!(outcome.succeeded, 1);
    assert!(chain.sends().contains(&"setInitialFinanceDirector".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_already_wired_target_counts_as_success_without_a_send() -> Result<()> {
    let ctx = TestContext::new();
    let mut manifest = supply_chain_manifest();
    manifest.wires.truncate(1);
    manifest.wires[0].check = Some("warehouseSupplierOrderManagement".to_string());

    let chain = MockChain::default();
    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report).await?;

    // The getter already reports WSOM's address, as if wired manually.
    let wsom = registry.get("WSOM").unwrap();
    chain.set_view(
        "warehouseSupplierOrderManagement",
        B256::left_padding_from(wsom.as_slice()),
    );

    let outcome = run_wiring_phase(&manifest, &ctx.env, &chain, &registry, &mut report).await?;
    assert_eq!(outcome.succeeded, 1);
    assert!(chain.sends().is_empty());

    let step = report.steps.last().unwrap();
    assert_eq!(step.status, StepStatus::Success);
    assert!(step.detail.contains("already holds the address"));
    Ok(())
}

#[tokio::test]
async fn test_cycle_aborts_the_deploy_phase_before_any_step() -> Result<()> {
    let ctx = TestContext::new();
    let manifest = Manifest {
        components: vec![component("A", &["B"]), component("B", &["A"])],
        wires: vec![],
    };
    let chain = MockChain::default();

    let mut registry = ctx.registry(&manifest, false)?;
    let mut report = ctx.report()?;
    let err = run_deploy_phase(&manifest, &ctx.env, &chain, &mut registry, &mut report)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("cycle"));
    assert!(chain.deploys().is_empty());
    assert!(report.steps.is_empty());
    Ok(())
}
