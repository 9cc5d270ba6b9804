pub mod address;
pub mod config;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod hashing;
pub mod metadata;
pub mod method;
pub mod node;
pub mod scale;
pub mod transaction;

pub use address::{Address, EthereumAddress, Ss58Address};
pub use config::{AddressFamily, AddressFormat, ChainConfig, RpcConfig, SignatureScheme};
pub use controller::{Operation, PreparedBatch, TransactionController};
pub use crypto::{CryptoBackend, Signer};
pub use error::{WalletError, WalletResult};
pub use metadata::{CallIndex, MetadataRegistry};
pub use method::{CallArgs, CallProvider, CallRegistry, Method};
pub use node::{AccountInfo, NodeClient, RpcNodeClient, RuntimeVersion};
pub use scale::{Compact, Hash, Scale, ScaleContext, ScaleValue};
pub use transaction::{
    ChainState, Era, Signature, Transaction, TransactionDetails, TransactionPayload,
};
