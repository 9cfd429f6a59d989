//! In-process stand-in for a Ganache node running `MyToken` and `TokenSale`.
//!
//! `FakeNode` is an alloy transport: it answers the JSON-RPC methods the
//! provider uses, mines one block per transaction and executes the two
//! contracts' externally visible behaviour, so the client can be exercised
//! end to end without a real node.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{
    Eip658Value, Header as ConsensusHeader, Receipt, ReceiptEnvelope, ReceiptWithBloom,
    Transaction, TxEnvelope,
};
use alloy::contract::RawCallBuilder;
use alloy::eips::eip2718::Decodable2718;
use alloy::hex;
use alloy::primitives::{Address, B256, Bloom, Bytes, Log as PrimitiveLog, U256, keccak256};
use alloy::rpc::client::RpcClient;
use alloy::rpc::json_rpc::{
    ErrorPayload, RequestPacket, Response, ResponsePacket, ResponsePayload, SerializedRequest,
};
use alloy::rpc::types::{
    Block, BlockTransactions, Header, Log as RpcLog, TransactionReceipt, TransactionRequest,
};
use alloy::sol_types::{Revert, SolCall, SolError, SolEvent, SolValue};
use alloy::transports::{TransportError, TransportFut};
use serde_json::value::to_raw_value;
use serde_json::{Value, json};
use tokensale_chain::contracts::{MyToken, TokenSale};
use tokensale_chain::{ConnectOptions, Connection, ContractArtifacts, WalletSource};
use tokensale_core::NetworkId;

pub const TOKEN_BYTECODE: &str = "0x608060405234801561001057600080fd5b5001";
pub const SALE_BYTECODE: &str = "0x608060405234801561001057600080fd5b5002";
pub const NETWORK_ID: u64 = 5777;
pub const CHAIN_ID: u64 = 1337;
pub const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

const GAS_ESTIMATE: u64 = 3_000_000;
const GAS_PRICE: u128 = 20_000_000_000;
const GAS_USED: u64 = 21_000;

// ---------------------------------------------------------------------------
// Chain state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct TokenState {
    balances: HashMap<Address, U256>,
    total_supply: U256,
}

impl TokenState {
    fn balance(&self, who: Address) -> U256 {
        self.balances.get(&who).copied().unwrap_or_default()
    }

    fn move_tokens(&mut self, from: Address, to: Address, amount: U256) -> Result<(), String> {
        let from_balance = self.balance(from);
        if from_balance < amount {
            return Err("ERC20: transfer amount exceeds balance".into());
        }
        self.balances.insert(from, from_balance - amount);
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct SaleState {
    token: Address,
    price: U256,
    admin: Address,
    sold: U256,
}

#[derive(Debug, Clone)]
enum Contract {
    Token(TokenState),
    Sale(SaleState),
}

#[derive(Debug, Clone)]
struct Log {
    address: Address,
    topics: Vec<B256>,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct Outcome {
    output: Vec<u8>,
    logs: Vec<Log>,
    created: Option<Address>,
}

#[derive(Debug, Clone)]
struct Tx {
    from: Address,
    to: Option<Address>,
    value: U256,
    data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
struct Chain {
    eth: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, Contract>,
}

fn transfer_log(token: Address, from: Address, to: Address, amount: U256) -> Log {
    Log {
        address: token,
        topics: vec![
            MyToken::Transfer::SIGNATURE_HASH,
            from.into_word(),
            to.into_word(),
        ],
        data: amount.abi_encode(),
    }
}

fn one_token() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

impl Chain {
    fn token_mut(&mut self, address: Address) -> Result<&mut TokenState, String> {
        match self.contracts.get_mut(&address) {
            Some(Contract::Token(token)) => Ok(token),
            _ => Err("call to non-contract".into()),
        }
    }

    fn execute(&mut self, tx: &Tx) -> Result<Outcome, String> {
        let balance = self.eth.get(&tx.from).copied().unwrap_or_default();
        if balance < tx.value {
            return Err("sender doesn't have enough funds to send tx".into());
        }
        let nonce = self.nonces.entry(tx.from).or_default();
        let current_nonce = *nonce;
        *nonce += 1;

        let outcome = match tx.to {
            None => self.deploy(tx, current_nonce)?,
            Some(to) => match self.contracts.get(&to).cloned() {
                None => Outcome::default(),
                Some(Contract::Token(_)) => self.call_token(to, tx)?,
                Some(Contract::Sale(sale)) => self.call_sale(to, sale, tx)?,
            },
        };

        let recipient = tx.to.or(outcome.created);
        if let Some(recipient) = recipient {
            *self.eth.entry(tx.from).or_default() -= tx.value;
            *self.eth.entry(recipient).or_default() += tx.value;
        }
        Ok(outcome)
    }

    fn deploy(&mut self, tx: &Tx, nonce: u64) -> Result<Outcome, String> {
        let token_code = hex::decode(TOKEN_BYTECODE).unwrap();
        let sale_code = hex::decode(SALE_BYTECODE).unwrap();
        let address = tx.from.create(nonce);
        let mut logs = Vec::new();

        if let Some(args) = tx.data.strip_prefix(token_code.as_slice()) {
            let supply_word = args.get(..32).ok_or("missing constructor argument")?;
            let supply = U256::from_be_slice(supply_word);
            let mut token = TokenState {
                total_supply: supply,
                ..Default::default()
            };
            token.balances.insert(tx.from, supply);
            logs.push(transfer_log(address, Address::ZERO, tx.from, supply));
            self.contracts.insert(address, Contract::Token(token));
        } else if let Some(args) = tx.data.strip_prefix(sale_code.as_slice()) {
            if args.len() < 64 {
                return Err("missing constructor arguments".into());
            }
            let sale = SaleState {
                token: Address::from_slice(&args[12..32]),
                price: U256::from_be_slice(&args[32..64]),
                admin: tx.from,
                sold: U256::ZERO,
            };
            self.contracts.insert(address, Contract::Sale(sale));
        } else {
            return Err("unknown creation code".into());
        }

        Ok(Outcome {
            output: Vec::new(),
            logs,
            created: Some(address),
        })
    }

    fn call_token(&mut self, address: Address, tx: &Tx) -> Result<Outcome, String> {
        let selector = selector(&tx.data)?;
        if !tx.value.is_zero() {
            return Err("Cannot send value to non-payable function".into());
        }
        let token = self.token_mut(address)?;

        let mut outcome = Outcome::default();
        if selector == MyToken::balanceOfCall::SELECTOR {
            let call = MyToken::balanceOfCall::abi_decode(&tx.data).map_err(|e| e.to_string())?;
            outcome.output = token.balance(call.account).abi_encode();
        } else if selector == MyToken::totalSupplyCall::SELECTOR {
            outcome.output = token.total_supply.abi_encode();
        } else if selector == MyToken::transferCall::SELECTOR {
            let call = MyToken::transferCall::abi_decode(&tx.data).map_err(|e| e.to_string())?;
            token.move_tokens(tx.from, call.to, call.amount)?;
            outcome.logs.push(transfer_log(address, tx.from, call.to, call.amount));
            outcome.output = true.abi_encode();
        } else {
            return Err("function selector was not recognized".into());
        }
        Ok(outcome)
    }

    fn call_sale(&mut self, address: Address, mut sale: SaleState, tx: &Tx) -> Result<Outcome, String> {
        let selector = selector(&tx.data)?;
        if selector != TokenSale::buyTokensCall::SELECTOR && !tx.value.is_zero() {
            return Err("Cannot send value to non-payable function".into());
        }

        let mut outcome = Outcome::default();
        if selector == TokenSale::tokenPriceCall::SELECTOR {
            outcome.output = sale.price.abi_encode();
        } else if selector == TokenSale::tokenContractCall::SELECTOR {
            outcome.output = sale.token.abi_encode();
        } else if selector == TokenSale::adminCall::SELECTOR {
            outcome.output = sale.admin.abi_encode();
        } else if selector == TokenSale::tokensSoldCall::SELECTOR {
            outcome.output = sale.sold.abi_encode();
        } else if selector == TokenSale::buyTokensCall::SELECTOR {
            let call =
                TokenSale::buyTokensCall::abi_decode(&tx.data).map_err(|e| e.to_string())?;
            let n = call.numberOfTokens;
            if tx.value != n * sale.price {
                return Err("Incorrect Ether value sent".into());
            }
            let amount = n * one_token();
            let token = self.token_mut(sale.token)?;
            if token.balance(address) < amount {
                return Err("Not enough tokens in contract".into());
            }
            token.move_tokens(address, tx.from, amount)?;
            sale.sold += n;
            outcome.logs.push(transfer_log(sale.token, address, tx.from, amount));
            let sell = TokenSale::Sell {
                buyer: tx.from,
                amount: n,
            };
            outcome.logs.push(Log {
                address,
                topics: vec![TokenSale::Sell::SIGNATURE_HASH],
                data: sell.encode_data(),
            });
        } else if selector == TokenSale::endSaleCall::SELECTOR {
            if tx.from != sale.admin {
                return Err("Only admin can end sale".into());
            }
            let admin = sale.admin;
            let token = self.token_mut(sale.token)?;
            let remaining = token.balance(address);
            token.move_tokens(address, admin, remaining)?;
            outcome.logs.push(transfer_log(sale.token, address, admin, remaining));
            let proceeds = self.eth.remove(&address).unwrap_or_default();
            *self.eth.entry(admin).or_default() += proceeds;
        } else {
            return Err("function selector was not recognized".into());
        }

        self.contracts.insert(address, Contract::Sale(sale));
        Ok(outcome)
    }
}

fn selector(data: &[u8]) -> Result<[u8; 4], String> {
    data.get(..4)
        .and_then(|s| <[u8; 4]>::try_from(s).ok())
        .ok_or_else(|| "missing function selector".to_string())
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Knobs for failure modes a real node can show.
#[derive(Debug, Clone)]
pub struct FakeNodeOptions {
    pub net_version: u64,
    /// Report reverts from `eth_estimateGas` (Ganache does).
    pub revert_on_estimate: bool,
    /// Mine reverting transactions with `status: 0x0` instead of rejecting them.
    pub mine_failed_receipts: bool,
    /// Accept transactions but never mine them.
    pub withhold_receipts: bool,
}

impl Default for FakeNodeOptions {
    fn default() -> Self {
        Self {
            net_version: NETWORK_ID,
            revert_on_estimate: true,
            mine_failed_receipts: false,
            withhold_receipts: false,
        }
    }
}

/// A signed transaction as the node decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub hash: B256,
    pub signer: Address,
    pub chain_id: Option<u64>,
    pub nonce: u64,
    pub gas_price: Option<u128>,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
}

/// A JSON-RPC error object.
struct Fault {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl Fault {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn bad_params(message: impl std::fmt::Display) -> Self {
        Self::new(-32602, format!("invalid params: {message}"))
    }

    /// What Ganache returns for a reverted call.
    fn revert(reason: &str) -> Self {
        let message = format!("VM Exception while processing transaction: revert {reason}");
        let payload = Revert {
            reason: reason.to_string(),
        }
        .abi_encode();
        Self {
            code: -32000,
            data: Some(json!({ "message": message, "data": hex::encode_prefixed(payload) })),
            message,
        }
    }
}

struct NodeState {
    chain: Chain,
    /// Serialized blocks by number; block 0 is genesis.
    blocks: Vec<Value>,
    block_hashes: Vec<B256>,
    receipts: HashMap<B256, Value>,
    requests: Vec<(String, Value)>,
    raw_transactions: Vec<RawTransaction>,
    tx_counter: u64,
}

impl NodeState {
    /// Seal a block holding `hashes` and return its number and hash.
    fn mine(&mut self, hashes: Vec<B256>) -> (u64, B256) {
        let number = self.blocks.len() as u64;
        let parent_hash = self.block_hashes.last().copied().unwrap_or_default();
        let header = Header::new(ConsensusHeader {
            parent_hash,
            number,
            timestamp: 1_600_000_000 + number,
            gas_limit: 6_721_975,
            ..Default::default()
        });
        let hash = header.hash;
        let block: Block = Block::new(header, BlockTransactions::Hashes(hashes));
        self.blocks.push(serde_json::to_value(&block).unwrap());
        self.block_hashes.push(hash);
        (number, hash)
    }
}

struct Inner {
    accounts: Vec<Address>,
    options: FakeNodeOptions,
    state: Mutex<NodeState>,
}

/// Cheap to clone; clones share one chain.
#[derive(Clone)]
pub struct FakeNode {
    inner: Arc<Inner>,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::with_options(FakeNodeOptions::default())
    }

    pub fn with_options(options: FakeNodeOptions) -> Self {
        let accounts: Vec<Address> = (0..10u8).map(|i| Address::repeat_byte(0x10 + i)).collect();
        let mut chain = Chain::default();
        for account in &accounts {
            chain.eth.insert(*account, U256::from(100u64) * one_token());
        }
        let mut state = NodeState {
            chain,
            blocks: Vec::new(),
            block_hashes: Vec::new(),
            receipts: HashMap::new(),
            requests: Vec::new(),
            raw_transactions: Vec::new(),
            tx_counter: 0,
        };
        state.mine(Vec::new());
        Self {
            inner: Arc::new(Inner {
                accounts,
                options,
                state: Mutex::new(state),
            }),
        }
    }

    /// An RPC client that talks to this node.
    pub fn client(&self) -> RpcClient {
        RpcClient::new(self.clone(), true)
    }

    /// Accounts the node signs for.
    pub fn accounts(&self) -> Vec<Address> {
        self.inner.accounts.clone()
    }

    /// Credit `amount` wei to an account the node does not manage.
    pub fn fund(&self, account: Address, amount: U256) {
        let mut state = self.inner.state.lock().unwrap();
        *state.chain.eth.entry(account).or_default() += amount;
    }

    pub fn eth_balance(&self, account: Address) -> U256 {
        let state = self.inner.state.lock().unwrap();
        state.chain.eth.get(&account).copied().unwrap_or_default()
    }

    pub fn block_number(&self) -> u64 {
        self.inner.state.lock().unwrap().blocks.len() as u64 - 1
    }

    /// Names of every method called so far, in order.
    pub fn methods_called(&self) -> Vec<String> {
        let state = self.inner.state.lock().unwrap();
        state.requests.iter().map(|(m, _)| m.clone()).collect()
    }

    /// Params of every call to `method`, in order.
    pub fn params_of(&self, method: &str) -> Vec<Value> {
        let state = self.inner.state.lock().unwrap();
        state
            .requests
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Signed transactions accepted through `eth_sendRawTransaction`.
    pub fn raw_transactions(&self) -> Vec<RawTransaction> {
        self.inner.state.lock().unwrap().raw_transactions.clone()
    }

    fn handle(&self, request: &SerializedRequest) -> Response {
        let params = request
            .params()
            .map(|raw| serde_json::from_str::<Value>(raw.get()).unwrap())
            .unwrap_or(Value::Null);
        let payload = match self.dispatch(request.method(), params) {
            Ok(result) => ResponsePayload::Success(to_raw_value(&result).unwrap()),
            Err(fault) => ResponsePayload::Failure(ErrorPayload {
                code: fault.code,
                message: fault.message.into(),
                data: fault.data.map(|data| to_raw_value(&data).unwrap()),
            }),
        };
        Response {
            id: request.id().clone(),
            payload,
        }
    }

    fn dispatch(&self, method: &str, params: Value) -> Result<Value, Fault> {
        let options = &self.inner.options;
        let mut state = self.inner.state.lock().unwrap();
        state.requests.push((method.to_string(), params.clone()));

        match method {
            "net_version" => Ok(json!(options.net_version.to_string())),
            "eth_chainId" => Ok(json!(format!("{CHAIN_ID:#x}"))),
            "eth_accounts" => Ok(json!(self.inner.accounts)),
            "eth_gasPrice" => Ok(json!(format!("{GAS_PRICE:#x}"))),
            "eth_blockNumber" => Ok(json!(format!("{:#x}", state.blocks.len() - 1))),
            "eth_getBlockByNumber" => {
                let number: U256 = param(&params, 0)?;
                let block = usize::try_from(number)
                    .ok()
                    .and_then(|n| state.blocks.get(n).cloned());
                Ok(block.unwrap_or(Value::Null))
            }
            "eth_getBalance" => {
                let who: Address = param(&params, 0)?;
                let balance = state.chain.eth.get(&who).copied().unwrap_or_default();
                Ok(json!(balance))
            }
            "eth_getTransactionCount" => {
                let who: Address = param(&params, 0)?;
                let nonce = state.chain.nonces.get(&who).copied().unwrap_or_default();
                Ok(json!(format!("{nonce:#x}")))
            }
            "eth_call" => {
                let (tx, _) = parse_request(&params)?;
                let mut scratch = state.chain.clone();
                scratch.eth.entry(tx.from).or_insert(tx.value);
                match scratch.execute(&tx) {
                    Ok(outcome) => Ok(json!(hex::encode_prefixed(outcome.output))),
                    Err(reason) => Err(Fault::revert(&reason)),
                }
            }
            "eth_estimateGas" => {
                let (tx, _) = parse_request(&params)?;
                if options.revert_on_estimate {
                    let mut scratch = state.chain.clone();
                    if let Err(reason) = scratch.execute(&tx) {
                        return Err(Fault::revert(&reason));
                    }
                }
                Ok(json!(format!("{GAS_ESTIMATE:#x}")))
            }
            "eth_sendTransaction" => {
                let (tx, request) = parse_request(&params)?;
                if !self.inner.accounts.contains(&tx.from) {
                    return Err(Fault::new(-32000, "sender account not recognized"));
                }
                check_nonce(&state.chain, tx.from, request.nonce)?;
                state.tx_counter += 1;
                let hash = keccak256(state.tx_counter.to_be_bytes());
                self.include(&mut state, hash, &tx)?;
                Ok(json!(hash))
            }
            "eth_sendRawTransaction" => {
                let raw: Bytes = param(&params, 0)?;
                let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
                    .map_err(|e| Fault::bad_params(format!("undecodable transaction: {e}")))?;
                let signer = envelope
                    .recover_signer()
                    .map_err(|e| Fault::bad_params(format!("bad signature: {e}")))?;
                if envelope.chain_id() != Some(CHAIN_ID) {
                    return Err(Fault::new(-32000, "invalid chain id for signer"));
                }
                check_nonce(&state.chain, signer, Some(envelope.nonce()))?;

                let hash = *envelope.tx_hash();
                state.raw_transactions.push(RawTransaction {
                    hash,
                    signer,
                    chain_id: envelope.chain_id(),
                    nonce: envelope.nonce(),
                    gas_price: envelope.gas_price(),
                    gas_limit: envelope.gas_limit(),
                    to: envelope.to(),
                    value: envelope.value(),
                });
                let tx = Tx {
                    from: signer,
                    to: envelope.to(),
                    value: envelope.value(),
                    data: envelope.input().to_vec(),
                };
                self.include(&mut state, hash, &tx)?;
                Ok(json!(hash))
            }
            "eth_getTransactionReceipt" => {
                let hash: B256 = param(&params, 0)?;
                Ok(state.receipts.get(&hash).cloned().unwrap_or(Value::Null))
            }
            _ => Err(Fault::new(-32601, "Method not found")),
        }
    }

    /// Execute `tx` and mine it, or reject it the way the options say.
    fn include(&self, state: &mut NodeState, hash: B256, tx: &Tx) -> Result<(), Fault> {
        let options = &self.inner.options;
        if options.withhold_receipts {
            return Ok(());
        }
        let mut next = state.chain.clone();
        let outcome = match next.execute(tx) {
            Ok(outcome) => {
                state.chain = next;
                Some(outcome)
            }
            Err(_) if options.mine_failed_receipts => {
                *state.chain.nonces.entry(tx.from).or_default() += 1;
                None
            }
            Err(reason) => return Err(Fault::revert(&reason)),
        };

        let (number, block_hash) = state.mine(vec![hash]);
        let logs = outcome
            .as_ref()
            .map(|outcome| outcome.logs.clone())
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, log)| RpcLog {
                inner: PrimitiveLog::new_unchecked(log.address, log.topics, log.data.into()),
                block_hash: Some(block_hash),
                block_number: Some(number),
                block_timestamp: None,
                transaction_hash: Some(hash),
                transaction_index: Some(0),
                log_index: Some(index as u64),
                removed: false,
            })
            .collect();
        let receipt = TransactionReceipt {
            inner: ReceiptEnvelope::Legacy(ReceiptWithBloom {
                receipt: Receipt {
                    status: Eip658Value::Eip658(outcome.is_some()),
                    cumulative_gas_used: GAS_USED,
                    logs,
                },
                logs_bloom: Bloom::ZERO,
            }),
            transaction_hash: hash,
            transaction_index: Some(0),
            block_hash: Some(block_hash),
            block_number: Some(number),
            gas_used: GAS_USED,
            effective_gas_price: GAS_PRICE,
            blob_gas_used: None,
            blob_gas_price: None,
            from: tx.from,
            to: tx.to,
            contract_address: outcome.and_then(|outcome| outcome.created),
        };
        state
            .receipts
            .insert(hash, serde_json::to_value(&receipt).unwrap());
        Ok(())
    }
}

fn param<T: serde::de::DeserializeOwned>(params: &Value, index: usize) -> Result<T, Fault> {
    serde_json::from_value(params[index].clone()).map_err(Fault::bad_params)
}

fn parse_request(params: &Value) -> Result<(Tx, TransactionRequest), Fault> {
    let request: TransactionRequest = param(params, 0)?;
    let tx = Tx {
        from: request.from.unwrap_or_default(),
        to: request.to.and_then(|kind| kind.to().copied()),
        value: request.value.unwrap_or_default(),
        data: request.input.input().map(|d| d.to_vec()).unwrap_or_default(),
    };
    Ok((tx, request))
}

fn check_nonce(chain: &Chain, from: Address, nonce: Option<u64>) -> Result<(), Fault> {
    let expected = chain.nonces.get(&from).copied().unwrap_or_default();
    match nonce {
        Some(nonce) if nonce != expected => Err(Fault::new(
            -32000,
            format!("the tx doesn't have the correct nonce. account has nonce of: {expected} tx has nonce of: {nonce}"),
        )),
        _ => Ok(()),
    }
}

impl tower::Service<RequestPacket> for FakeNode {
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, packet: RequestPacket) -> Self::Future {
        let node = self.clone();
        Box::pin(async move {
            Ok(match packet {
                RequestPacket::Single(request) => ResponsePacket::Single(node.handle(&request)),
                RequestPacket::Batch(requests) => {
                    ResponsePacket::Batch(requests.iter().map(|r| node.handle(r)).collect())
                }
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn fast_options() -> ConnectOptions {
    ConnectOptions {
        gas_limit: None,
        gas_price: None,
        poll_interval: Duration::from_millis(5),
        receipt_timeout: Duration::from_millis(200),
    }
}

pub async fn connect(node: &FakeNode) -> Arc<Connection> {
    Connection::with_client(node.client(), NetworkId::Any, WalletSource::Node, fast_options())
        .await
        .expect("connect to fake node")
}

/// Connect with HD accounts from [`TEST_MNEMONIC`], funding them first.
pub async fn connect_local(node: &FakeNode, accounts: u32) -> Arc<Connection> {
    let source = WalletSource::Mnemonic {
        phrase: TEST_MNEMONIC.to_string(),
        accounts,
    };
    let conn = Connection::with_client(node.client(), NetworkId::Any, source, fast_options())
        .await
        .expect("connect to fake node");
    for account in conn.accounts() {
        node.fund(account, U256::from(100u64) * one_token());
    }
    conn
}

/// Send plain ether through the connection's transaction path.
pub async fn send_value(
    conn: &Connection,
    from: Address,
    to: Address,
    value: U256,
) -> tokensale_chain::Result<TransactionReceipt> {
    let call = RawCallBuilder::new_raw(conn.provider(), Bytes::new())
        .to(to)
        .value(value);
    conn.send(call, from).await
}

/// Write Truffle-style artifacts for both contracts and load them back.
pub fn write_artifacts(dir: &Path) -> ContractArtifacts {
    for (name, bytecode) in [("MyToken", TOKEN_BYTECODE), ("TokenSale", SALE_BYTECODE)] {
        let artifact = json!({
            "contractName": name,
            "abi": [],
            "bytecode": bytecode,
            "compiler": { "name": "solc", "version": "0.8.0+commit.c7dfd78e.Emscripten.clang" },
        });
        std::fs::write(dir.join(format!("{name}.json")), artifact.to_string()).unwrap();
    }
    ContractArtifacts::load(dir, "0.8.0").expect("load test artifacts")
}
