//! Assistant personas
//!
//! A persona fixes everything about a conversation that is not derived from
//! the replies themselves: the seeded welcome, the fixed failure text, what
//! context travels with each message, and the starter prompts on offer.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Analysis, RiskLevel, SolutionProgress};

/// Which assistant the session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Collaborative solutions partner with progress tracking
    #[default]
    Partner,
    /// Plain question-and-answer DeFi advisor
    Advisor,
}

/// Suggested opening message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarterPrompt {
    pub id: &'static str,
    pub question: &'static str,
    pub category: &'static str,
    pub kind: &'static str,
    pub description: &'static str,
}

const PARTNER_WELCOME: &str = "**Welcome to CAMP Lab - Your DeFi Solutions Partner**\n\n\
I'm your collaborative partner for the CAMP ecosystem, DeFi strategy, and the USDca stablecoin protocol.\n\n\
**What I bring:**\n\
• **CAMP Expert** - USDca, minting, and governance\n\
• **1B Insurance Fund** - Guidance on the ecosystem's protection\n\
• **DeFi Strategist** - Multi-collateral optimization (WBTC, USDC, USDT, ETH, WSOL)\n\
• **Risk Specialist** - Smart contract security and portfolio protection\n\
• **Solutions Partner** - Actionable strategies we build together\n\n\
Share your DeFi goals, CAMP questions, or strategic challenges and we'll work through them together.";

const ADVISOR_WELCOME: &str = "**Welcome to Lab AI - Your DeFi Advisor**\n\n\
I provide analysis and strategic guidance for your DeFi portfolio:\n\n\
• **Portfolio Optimization** - Risk-adjusted returns\n\
• **Yield Strategies** - Maximum APY with controlled risk\n\
• **Risk Management** - Security analysis\n\
• **Market Intelligence** - Insights and timing\n\n\
How can I assist you today?";

const PARTNER_FAILURE: &str = "I'm experiencing technical difficulties, but I'm still committed to working with you. Let me try to reconnect and continue our collaboration.";

const ADVISOR_FAILURE: &str =
    "I apologize, but I'm experiencing technical difficulties. Please try again in a moment.";

const PARTNER_EXPERTISE: &[&str] = &[
    "CAMP Ecosystem Expert",
    "USDca Strategy Optimization",
    "DeFi Risk Analysis",
    "Smart Contract Security",
    "Yield Maximization",
    "Solution Development",
];

const ADVISOR_EXPERTISE: &[&str] = &[
    "Risk Management",
    "Yield Optimization",
    "Market Analysis",
    "Portfolio Strategy",
];

const PARTNER_SPECIALIZATIONS: &[&str] = &[
    "1B Insurance Fund Management",
    "Multi-collateral Strategies",
    "Off-chain Order Optimization",
    "Governance & Risk Management",
];

const PARTNER_PROMPTS: &[StarterPrompt] = &[
    StarterPrompt {
        id: "camp-strategy",
        question: "Let's optimize my USDca minting and yield strategy",
        category: "CAMP Strategy",
        kind: "camp_collaboration",
        description: "Develop personalized CAMP ecosystem strategies",
    },
    StarterPrompt {
        id: "defi-innovation",
        question: "I want to build a new DeFi solution - let's collaborate",
        category: "DeFi Innovation",
        kind: "collaboration",
        description: "Co-create new DeFi products",
    },
    StarterPrompt {
        id: "risk-analysis",
        question: "Help me analyze and mitigate DeFi risks in my portfolio",
        category: "Risk Management",
        kind: "camp_collaboration",
        description: "Risk assessment and protection",
    },
    StarterPrompt {
        id: "contract-optimization",
        question: "Let's review and optimize smart contract implementations",
        category: "Smart Contracts",
        kind: "collaboration",
        description: "Technical review and enhancement",
    },
    StarterPrompt {
        id: "yield-maximize",
        question: "Design a yield maximization strategy using CAMP protocols",
        category: "Yield Optimization",
        kind: "camp_collaboration",
        description: "Yield farming and optimization",
    },
    StarterPrompt {
        id: "solution-proposal",
        question: "I have an idea for improving the CAMP ecosystem",
        category: "Ecosystem Development",
        kind: "collaboration",
        description: "Community-driven platform improvements",
    },
];

const ADVISOR_PROMPTS: &[StarterPrompt] = &[
    StarterPrompt {
        id: "portfolio-analysis",
        question: "Analyze my portfolio performance",
        category: "Portfolio",
        kind: "question",
        description: "Performance review of current positions",
    },
    StarterPrompt {
        id: "yield-opportunities",
        question: "Show me the best yield farming opportunities",
        category: "Yield",
        kind: "question",
        description: "Current yield opportunities",
    },
    StarterPrompt {
        id: "risk-assessment",
        question: "What are the current market risks?",
        category: "Risk",
        kind: "question",
        description: "Market risk overview",
    },
    StarterPrompt {
        id: "market-timing",
        question: "Is this a good time to enter positions?",
        category: "Timing",
        kind: "question",
        description: "Entry timing guidance",
    },
];

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Partner => "partner",
            Persona::Advisor => "advisor",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Partner => "CAMP Lab",
            Persona::Advisor => "Lab",
        }
    }

    /// Prefix for generated session ids
    pub fn session_prefix(&self) -> &'static str {
        match self {
            Persona::Partner => "camp-lab",
            Persona::Advisor => "lab-session",
        }
    }

    /// Whether replies carry derived solution progress and collaboration stamps
    pub fn tracks_progress(&self) -> bool {
        matches!(self, Persona::Partner)
    }

    pub fn welcome_content(&self) -> &'static str {
        match self {
            Persona::Partner => PARTNER_WELCOME,
            Persona::Advisor => ADVISOR_WELCOME,
        }
    }

    pub fn welcome_analysis(&self) -> Analysis {
        match self {
            Persona::Partner => Analysis::new(RiskLevel::Low, 100, "camp_partnership_welcome")
                .with_collaboration("expert_onboarding"),
            Persona::Advisor => Analysis::new(RiskLevel::Low, 100, "welcome"),
        }
    }

    pub fn welcome_progress(&self) -> Option<SolutionProgress> {
        match self {
            Persona::Partner => Some(SolutionProgress {
                phase: "CAMP Expert Ready".to_string(),
                progress: 0,
                artifacts: [
                    "CAMP Knowledge Base",
                    "Insurance Fund Protection",
                    "DeFi Strategy Framework",
                ]
                .into_iter()
                .map(String::from)
                .collect::<BTreeSet<_>>(),
            }),
            Persona::Advisor => None,
        }
    }

    /// Fixed apology appended when the assistant cannot be reached
    pub fn failure_content(&self) -> &'static str {
        match self {
            Persona::Partner => PARTNER_FAILURE,
            Persona::Advisor => ADVISOR_FAILURE,
        }
    }

    /// Analysis for the failure message; confidence is always 0
    pub fn failure_analysis(&self) -> Analysis {
        let analysis = Analysis::new(RiskLevel::Low, 0, "error");
        match self {
            Persona::Partner => analysis.with_collaboration("technical_issue"),
            Persona::Advisor => analysis,
        }
    }

    pub fn expertise(&self) -> &'static [&'static str] {
        match self {
            Persona::Partner => PARTNER_EXPERTISE,
            Persona::Advisor => ADVISOR_EXPERTISE,
        }
    }

    pub fn specializations(&self) -> &'static [&'static str] {
        match self {
            Persona::Partner => PARTNER_SPECIALIZATIONS,
            Persona::Advisor => &[],
        }
    }

    pub fn starter_prompts(&self) -> &'static [StarterPrompt] {
        match self {
            Persona::Partner => PARTNER_PROMPTS,
            Persona::Advisor => ADVISOR_PROMPTS,
        }
    }
}

impl std::str::FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partner" => Ok(Persona::Partner),
            "advisor" => Ok(Persona::Advisor),
            _ => Err(format!("unknown persona: {}", s)),
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
