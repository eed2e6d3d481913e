//! The fixed contract surface the bot builds transactions against.
//!
//! Declared once with `sol!`; the generated call structs give us calldata
//! encoding for unsigned transactions and typed eth_call simulation.

use alloy_sol_types::sol;

// ERC-20 interface (minimal: allowance flow + balances)
sol! {
    #[sol(rpc)]
    contract IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

// EmpowerTours application contract
sol! {
    #[sol(rpc)]
    contract IEmpowerTours {
        function createProfile(string name) external;
        function addJournalEntry(string content) external;
        function buyTokens() external payable;
        function createClimb(string name, string location, uint8 difficulty, uint256 price) external;
        function purchaseClimb(uint256 climbId) external;
        function createTournament(uint256 entryFee) external;
        function joinTournament(uint256 tournamentId) external;
        function endTournament(uint256 tournamentId, address winner) external;
    }
}
