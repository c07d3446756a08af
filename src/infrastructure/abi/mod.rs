//! Fixed ABI surface for the stall and settlement token contracts
//!
//! Signatures are parsed once at startup; calldata encoding and return
//! decoding go through alloy-dyn-abi.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::keccak256;
use anyhow::{bail, Context, Result};

/// A contract function: selector plus typed inputs and outputs.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: String,
    /// Normalized signature, e.g. "approve(address,uint256)".
    pub signature: String,
    pub selector: [u8; 4],
    inputs: Vec<DynSolType>,
    outputs: Vec<DynSolType>,
}

impl FunctionSpec {
    /// Parse a flat (tuple-free) signature and comma-separated return types.
    pub fn parse(signature: &str, returns: &str) -> Result<Self> {
        let normalized = signature.replace(' ', "");

        let open_paren = normalized
            .find('(')
            .with_context(|| format!("Invalid signature '{signature}': missing '('"))?;
        let close_paren = normalized
            .rfind(')')
            .with_context(|| format!("Invalid signature '{signature}': missing ')'"))?;
        if close_paren <= open_paren {
            bail!("Invalid signature '{signature}': malformed parentheses");
        }

        let name = normalized[..open_paren].to_string();
        let inputs = parse_type_list(&normalized[open_paren + 1..close_paren])?;
        let outputs = parse_type_list(&returns.replace(' ', ""))?;

        let hash = keccak256(normalized.as_bytes());
        let selector: [u8; 4] = hash[..4].try_into()?;

        Ok(Self {
            name,
            signature: normalized,
            selector,
            inputs,
            outputs,
        })
    }

    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }

    /// Encode selector + arguments into calldata.
    pub fn encode_call(&self, args: &[DynSolValue]) -> Result<Vec<u8>> {
        if args.len() != self.inputs.len() {
            bail!(
                "{}: expected {} arguments, got {}",
                self.signature,
                self.inputs.len(),
                args.len()
            );
        }

        let mut calldata = self.selector.to_vec();
        if !args.is_empty() {
            let tuple = DynSolValue::Tuple(args.to_vec());
            calldata.extend_from_slice(&tuple.abi_encode_params());
        }
        Ok(calldata)
    }

    /// Decode return data into one positional value per output type.
    pub fn decode_return(&self, data: &[u8]) -> Result<Vec<DynSolValue>> {
        if self.outputs.is_empty() {
            return Ok(Vec::new());
        }

        let tuple_type = DynSolType::Tuple(self.outputs.clone());
        let decoded = tuple_type
            .abi_decode_sequence(data)
            .with_context(|| format!("Failed to decode return data of {}", self.signature))?;

        Ok(match decoded {
            DynSolValue::Tuple(values) => values,
            other => vec![other],
        })
    }
}

fn parse_type_list(list: &str) -> Result<Vec<DynSolType>> {
    if list.is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(|kind| {
            kind.parse::<DynSolType>()
                .with_context(|| format!("Failed to parse type '{kind}'"))
        })
        .collect()
}

/// The full function surface this client calls.
#[derive(Debug, Clone)]
pub struct StallAbi {
    pub books_length: FunctionSpec,
    pub get_book: FunctionSpec,
    pub add_book: FunctionSpec,
    pub buy_book: FunctionSpec,
    pub mark_as_read: FunctionSpec,
    pub mark_as_unread: FunctionSpec,
    pub remove_book: FunctionSpec,
    /// ERC-20 approval on the settlement token.
    pub approve: FunctionSpec,
}

impl StallAbi {
    pub fn new() -> Result<Self> {
        Ok(Self {
            books_length: FunctionSpec::parse("getBooksLength()", "uint256")?,
            get_book: FunctionSpec::parse(
                "getBook(uint256)",
                "address,string,string,string,uint256,uint256,bool",
            )?,
            add_book: FunctionSpec::parse("addBook(string,string,string,uint256)", "")?,
            buy_book: FunctionSpec::parse("buyBook(uint256)", "")?,
            mark_as_read: FunctionSpec::parse("markAsRead(uint256)", "")?,
            mark_as_unread: FunctionSpec::parse("markAsUnread(uint256)", "")?,
            remove_book: FunctionSpec::parse("removeBook(uint256)", "")?,
            approve: FunctionSpec::parse("approve(address,uint256)", "bool")?,
        })
    }

    /// Look up a function by its contract entry-point name.
    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        match name {
            "getBooksLength" => Some(&self.books_length),
            "getBook" => Some(&self.get_book),
            "addBook" => Some(&self.add_book),
            "buyBook" => Some(&self.buy_book),
            "markAsRead" => Some(&self.mark_as_read),
            "markAsUnread" => Some(&self.mark_as_unread),
            "removeBook" => Some(&self.remove_book),
            "approve" => Some(&self.approve),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256};

    use super::*;

    #[test]
    fn test_known_erc20_selector() {
        let abi = StallAbi::new().unwrap();
        assert_eq!(abi.approve.selector_hex(), "0x095ea7b3");
        assert_eq!(abi.approve.signature, "approve(address,uint256)");
    }

    #[test]
    fn test_encode_get_book() {
        let abi = StallAbi::new().unwrap();
        let calldata = abi
            .get_book
            .encode_call(&[DynSolValue::Uint(U256::from(7u64), 256)])
            .unwrap();

        assert_eq!(calldata.len(), 4 + 32);
        assert_eq!(&calldata[..4], &abi.get_book.selector);
        assert_eq!(calldata[4 + 31], 7);
    }

    #[test]
    fn test_encode_rejects_arity_mismatch() {
        let abi = StallAbi::new().unwrap();
        assert!(abi.buy_book.encode_call(&[]).is_err());
    }

    #[test]
    fn test_decode_book_return() {
        let abi = StallAbi::new().unwrap();
        let values = vec![
            DynSolValue::Address(Address::repeat_byte(0x42)),
            DynSolValue::String("Dune".to_string()),
            DynSolValue::String("Frank Herbert".to_string()),
            DynSolValue::String("https://example.com/dune.png".to_string()),
            DynSolValue::Uint(U256::from(1000u64), 256),
            DynSolValue::Uint(U256::from(12u64), 256),
            DynSolValue::Bool(true),
        ];
        let encoded = DynSolValue::Tuple(values.clone()).abi_encode_params();

        let decoded = abi.get_book.decode_return(&encoded).unwrap();
        assert_eq!(decoded.len(), 7);
        assert_eq!(decoded[1], DynSolValue::String("Dune".to_string()));
        assert_eq!(decoded[6], DynSolValue::Bool(true));
    }

    #[test]
    fn test_unknown_function() {
        let abi = StallAbi::new().unwrap();
        assert!(abi.function("transferFrom").is_none());
    }
}
