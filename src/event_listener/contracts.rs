use ethers::contract::abigen;

abigen!(
    UniswapV2Factory,
    r#"[
        event PairCreated(address indexed token0, address indexed token1, address pair, uint256)
        function getPair(address tokenA, address tokenB) external view returns (address pair)
    ]"#
);

abigen!(
    UniswapV2Pair,
    r#"[
        event Transfer(address indexed from, address indexed to, uint256 value)
        event Sync(uint112 reserve0, uint112 reserve1)
        event Mint(address indexed sender, uint256 amount0, uint256 amount1)
        event Burn(address indexed sender, uint256 amount0, uint256 amount1, address indexed to)
        event Swap(address indexed sender, uint256 amount0In, uint256 amount1In, uint256 amount0Out, uint256 amount1Out, address indexed to)
    ]"#
);

abigen!(
    ERC20,
    r#"[
        function symbol() external view returns (string)
        function name() external view returns (string)
        function decimals() external view returns (uint8)
        function totalSupply() external view returns (uint256)
    ]"#
);

// 早期代币 (MKR 等) 的 symbol/name 返回 bytes32
abigen!(
    ERC20SymbolBytes,
    r#"[
        function symbol() external view returns (bytes32)
        function name() external view returns (bytes32)
    ]"#
);

pub const PAIR_CREATED_SIGNATURE: &str = "PairCreated(address,address,address,uint256)";

pub const PAIR_EVENT_SIGNATURES: [&str; 5] = [
    "Transfer(address,address,uint256)",
    "Sync(uint112,uint112)",
    "Mint(address,uint256,uint256)",
    "Burn(address,uint256,uint256,address)",
    "Swap(address,uint256,uint256,uint256,uint256,address)",
];
