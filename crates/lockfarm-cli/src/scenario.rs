//! Scenario replay
//!
//! A scenario file describes a farm, funded accounts, and a list of steps
//! replayed against in-memory assets on a manual clock:
//!
//! ```toml
//! owner = "admin"
//!
//! [farm]
//! reward_per_second = 10
//! start_time = 100
//!
//! [[accounts]]
//! name = "admin"
//! reward = 10000
//!
//! [[accounts]]
//! name = "alice"
//! staked = 1000
//!
//! [[steps]]
//! action = "fund"
//! from = "admin"
//! amount = 10000
//!
//! [[steps]]
//! action = "advance"
//! seconds = 100
//! ```

use anyhow::{bail, Context};
use lockfarm_core::{
    Address, Amount, AssetId, AssetTransferPort, Clock, ManualClock, MemoryAsset, Timestamp,
};
use lockfarm_engine::{AssetPorts, Farm, FarmConfig, FarmEvent, PenaltyKind, PoolSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

const CUSTODY: u64 = 0xc0;
const STAKED_ASSET: u64 = 0x5001;
const REWARD_ASSET: u64 = 0x5002;
const SECONDARY_ASSET: u64 = 0x5003;
const ACCOUNT_BASE: u64 = 0x1000;

#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    /// Account name of the farm owner
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Clock reading when the farm is initialized
    #[serde(default)]
    pub clock_start: Timestamp,

    /// Use one asset for both staking and rewards
    #[serde(default)]
    pub same_asset: bool,

    /// Secondary reward balance minted into custody; enables the secondary asset
    #[serde(default)]
    pub secondary_supply: Option<u64>,

    #[serde(default)]
    pub farm: FarmConfig,

    #[serde(default)]
    pub accounts: Vec<AccountSpec>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_owner() -> String {
    "owner".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct AccountSpec {
    pub name: String,

    /// Explicit address (hex); derived from the account order otherwise
    #[serde(default)]
    pub address: Option<Address>,

    #[serde(default)]
    pub staked: u64,

    #[serde(default)]
    pub reward: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,

    /// Abort the run if this step fails
    #[serde(default)]
    pub expect_ok: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Fund {
        from: String,
        amount: u64,
    },
    Deposit {
        account: String,
        amount: u64,
        #[serde(default)]
        lock_days: u64,
    },
    Withdraw {
        account: String,
        #[serde(default)]
        index: usize,
    },
    EmergencyWithdraw {
        account: String,
        #[serde(default)]
        index: usize,
    },
    Advance {
        seconds: u64,
    },
    SetPenalty {
        penalty: PenaltyKind,
        #[serde(default)]
        caller: Option<String>,
    },
    CollectFees,
}

impl Action {
    fn label(&self) -> String {
        match self {
            Self::Fund { from, amount } => format!("fund {} from {}", amount, from),
            Self::Deposit {
                account,
                amount,
                lock_days,
            } => format!("deposit {} by {} for {} days", amount, account, lock_days),
            Self::Withdraw { account, index } => format!("withdraw {}#{}", account, index),
            Self::EmergencyWithdraw { account, index } => {
                format!("emergency_withdraw {}#{}", account, index)
            }
            Self::Advance { seconds } => format!("advance {}s", seconds),
            Self::SetPenalty { penalty, .. } => format!("set_penalty {}", penalty),
            Self::CollectFees => "collect_fees".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub action: String,
    pub time: Timestamp,
    pub ok: bool,
    /// Receipt on success, error message on failure
    pub detail: serde_json::Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct AccountBalance {
    pub name: String,
    pub address: Address,
    pub staked: Amount,
    pub reward: Amount,
    pub secondary: Amount,
}

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub outcomes: Vec<StepOutcome>,
    pub pool: PoolSnapshot,
    pub participants: usize,
    pub balances: Vec<AccountBalance>,
    pub events: Vec<FarmEvent>,
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let scenario: Self = toml::from_str(content).context("invalid scenario file")?;
        scenario.farm.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

struct World {
    farm: Farm,
    clock: Arc<ManualClock>,
    staked: Arc<MemoryAsset>,
    reward: Arc<MemoryAsset>,
    secondary: Option<Arc<MemoryAsset>>,
    accounts: BTreeMap<String, Address>,
    owner: Address,
}

impl World {
    fn build(scenario: &Scenario) -> anyhow::Result<Self> {
        let staked = Arc::new(MemoryAsset::new(AssetId(Address::from_low_u64(STAKED_ASSET))));
        let reward = if scenario.same_asset {
            staked.clone()
        } else {
            Arc::new(MemoryAsset::new(AssetId(Address::from_low_u64(REWARD_ASSET))))
        };
        let secondary = scenario.secondary_supply.map(|supply| {
            let asset = Arc::new(MemoryAsset::new(AssetId(Address::from_low_u64(SECONDARY_ASSET))));
            asset.mint(Address::from_low_u64(CUSTODY), supply as Amount);
            asset
        });

        let mut accounts = BTreeMap::new();
        for (slot, entry) in scenario.accounts.iter().enumerate() {
            let address = entry
                .address
                .unwrap_or_else(|| Address::from_low_u64(ACCOUNT_BASE + slot as u64));
            if accounts.insert(entry.name.clone(), address).is_some() {
                bail!("duplicate account name: {}", entry.name);
            }
            staked.mint(address, entry.staked as Amount);
            reward.mint(address, entry.reward as Amount);
        }
        let next = ACCOUNT_BASE + accounts.len() as u64;
        let owner = *accounts
            .entry(scenario.owner.clone())
            .or_insert_with(|| Address::from_low_u64(next));

        let clock = Arc::new(ManualClock::new(scenario.clock_start));
        let ports = AssetPorts {
            staked: staked.clone(),
            reward: reward.clone(),
            secondary: secondary
                .clone()
                .map(|s| s as Arc<dyn AssetTransferPort>),
        };
        let farm = Farm::initialize(
            scenario.farm.clone(),
            owner,
            Address::from_low_u64(CUSTODY),
            ports,
            clock.clone(),
        )
        .context("failed to initialize farm")?;

        Ok(Self {
            farm,
            clock,
            staked,
            reward,
            secondary,
            accounts,
            owner,
        })
    }

    fn account(&self, name: &str) -> anyhow::Result<Address> {
        self.accounts
            .get(name)
            .copied()
            .with_context(|| format!("unknown account: {}", name))
    }

    fn apply(&self, action: &Action) -> anyhow::Result<serde_json::Value> {
        let farm = &self.farm;
        let detail = match action {
            Action::Fund { from, amount } => {
                serde_json::to_value(farm.fund(self.account(from)?, *amount as Amount)?)?
            }
            Action::Deposit {
                account,
                amount,
                lock_days,
            } => serde_json::to_value(farm.deposit(
                self.account(account)?,
                *amount as Amount,
                *lock_days,
            )?)?,
            Action::Withdraw { account, index } => {
                serde_json::to_value(farm.withdraw(self.account(account)?, *index)?)?
            }
            Action::EmergencyWithdraw { account, index } => {
                serde_json::to_value(farm.emergency_withdraw(self.account(account)?, *index)?)?
            }
            Action::Advance { seconds } => {
                serde_json::json!({ "now": self.clock.advance(*seconds) })
            }
            Action::SetPenalty { penalty, caller } => {
                let caller = match caller {
                    Some(name) => self.account(name)?,
                    None => self.owner,
                };
                farm.set_penalty(caller, *penalty)?;
                serde_json::json!({ "penalty": penalty })
            }
            Action::CollectFees => {
                let amount = farm.withdraw_collected_fees(self.owner)?;
                serde_json::json!({ "collected": amount.to_string() })
            }
        };
        Ok(detail)
    }

    fn balances(&self) -> Vec<AccountBalance> {
        let custody = Address::from_low_u64(CUSTODY);
        let mut named: Vec<(String, Address)> = self
            .accounts
            .iter()
            .map(|(name, address)| (name.clone(), *address))
            .collect();
        named.push(("custody".to_string(), custody));
        named
            .into_iter()
            .map(|(name, address)| AccountBalance {
                name,
                address,
                staked: self.staked.balance_of(address),
                reward: self.reward.balance_of(address),
                secondary: self
                    .secondary
                    .as_ref()
                    .map(|s| s.balance_of(address))
                    .unwrap_or(0),
            })
            .collect()
    }
}

/// Replay every step and build the final report
pub fn run(scenario: &Scenario) -> anyhow::Result<Report> {
    let world = World::build(scenario)?;
    let mut outcomes = Vec::with_capacity(scenario.steps.len());

    for (step, entry) in scenario.steps.iter().enumerate() {
        let label = entry.action.label();
        let time = world.clock.now();
        let outcome = match world.apply(&entry.action) {
            Ok(detail) => StepOutcome {
                step,
                action: label,
                time,
                ok: true,
                detail,
            },
            Err(e) => {
                if entry.expect_ok {
                    return Err(e.context(format!("step {} ({}) failed", step, label)));
                }
                tracing::warn!("Step {} ({}) failed: {:#}", step, label, e);
                StepOutcome {
                    step,
                    action: label,
                    time,
                    ok: false,
                    detail: serde_json::Value::String(format!("{:#}", e)),
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(Report {
        outcomes,
        pool: world.farm.pool_snapshot()?,
        participants: world.farm.participant_count()?,
        balances: world.balances(),
        events: world.farm.drain_events()?,
    })
}

/// Human-readable rendering of a report
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let status = if outcome.ok { "ok" } else { "FAILED" };
        out.push_str(&format!(
            "[{:>3}] t={:<10} {:<40} {} {}\n",
            outcome.step, outcome.time, outcome.action, status, outcome.detail
        ));
    }

    let pool = &report.pool;
    out.push_str("\nPool\n");
    out.push_str(&format!("  horizon            {}..{}\n", pool.start_time, pool.end_time));
    out.push_str(&format!("  total deposits     {}\n", pool.total_deposits));
    out.push_str(&format!("  total shares       {}\n", pool.total_shares));
    out.push_str(&format!("  outstanding reward {}\n", pool.total_rewards));
    out.push_str(&format!("  paid out           {}\n", pool.paid_out));
    out.push_str(&format!("  burned             {}\n", pool.total_tokens_burned));
    out.push_str(&format!("  fees held          {}\n", pool.total_fee_collected));
    out.push_str(&format!("  penalty            {}\n", pool.penalty));
    out.push_str(&format!("  participants       {}\n", report.participants));

    out.push_str("\nBalances\n");
    for balance in &report.balances {
        out.push_str(&format!(
            "  {:<12} staked {:<12} reward {:<12} secondary {}\n",
            balance.name, balance.staked, balance.reward, balance.secondary
        ));
    }

    out.push_str(&format!("\nEvents ({})\n", report.events.len()));
    for event in &report.events {
        out.push_str(&format!("  {}\n", event.name()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
        owner = "admin"

        [farm]
        reward_per_second = 10
        start_time = 100

        [[accounts]]
        name = "admin"
        reward = 10000

        [[accounts]]
        name = "alice"
        staked = 1000

        [[steps]]
        action = "fund"
        from = "admin"
        amount = 10000
        expect_ok = true

        [[steps]]
        action = "advance"
        seconds = 100

        [[steps]]
        action = "deposit"
        account = "alice"
        amount = 100

        [[steps]]
        action = "advance"
        seconds = 10

        [[steps]]
        action = "withdraw"
        account = "alice"
    "#;

    fn balance<'a>(report: &'a Report, name: &str) -> &'a AccountBalance {
        report.balances.iter().find(|b| b.name == name).unwrap()
    }

    #[test]
    fn test_basic_scenario() {
        let scenario = Scenario::from_toml_str(BASIC).unwrap();
        let report = run(&scenario).unwrap();

        assert!(report.outcomes.iter().all(|o| o.ok));
        assert_eq!(balance(&report, "alice").reward, 100);
        assert_eq!(balance(&report, "alice").staked, 1000);
        assert_eq!(report.pool.total_rewards, 9_900);
        assert_eq!(report.participants, 0);
        assert_eq!(report.events.len(), 4);
    }

    #[test]
    fn test_failed_step_is_reported() {
        let content = format!(
            "{}\n[[steps]]\naction = \"withdraw\"\naccount = \"alice\"\n",
            BASIC
        );
        let report = run(&Scenario::from_toml_str(&content).unwrap()).unwrap();
        let last = report.outcomes.last().unwrap();
        assert!(!last.ok);
        assert!(last.detail.as_str().unwrap().contains("already closed"));
    }

    #[test]
    fn test_expect_ok_aborts() {
        let content = format!(
            "{}\n[[steps]]\naction = \"set_penalty\"\npenalty = \"burn_rewards\"\ncaller = \"alice\"\nexpect_ok = true\n",
            BASIC
        );
        let err = run(&Scenario::from_toml_str(&content).unwrap()).unwrap_err();
        assert!(format!("{:#}", err).contains("Unauthorized"));
    }

    #[test]
    fn test_unknown_account_and_duplicates() {
        let content = format!(
            "{}\n[[steps]]\naction = \"deposit\"\naccount = \"mallory\"\namount = 1\n",
            BASIC
        );
        let report = run(&Scenario::from_toml_str(&content).unwrap()).unwrap();
        assert!(!report.outcomes.last().unwrap().ok);

        let duplicate = r#"
            [[accounts]]
            name = "alice"
            [[accounts]]
            name = "alice"
        "#;
        assert!(run(&Scenario::from_toml_str(duplicate).unwrap()).is_err());
    }

    #[test]
    fn test_report_renders() {
        let report = run(&Scenario::from_toml_str(BASIC).unwrap()).unwrap();
        let text = render_text(&report);
        assert!(text.contains("withdraw alice#0"));
        assert!(text.contains("reward_paid"));
        assert!(serde_json::to_string(&report).is_ok());
    }
}
