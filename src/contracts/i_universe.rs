use ethers::prelude::abigen;

abigen!(
    IUniverse,
    r#"[
        function isForking() external view returns (bool)
        function getForkingMarket() external view returns (address)
    ]"#
);
