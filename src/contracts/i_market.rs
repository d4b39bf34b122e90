use ethers::prelude::abigen;

abigen!(
    IMarket,
    r#"[
        function isFinalized() external view returns (bool)
    ]"#
);
