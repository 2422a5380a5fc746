pub mod raydium_amm;

use std::str::FromStr;

use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::types::RawInstruction;

pub const RAYDIUM_AMM_V4_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// First instruction invoking `program_id` with a non-empty payload.
///
/// Instructions whose program index falls outside `account_keys` never match.
/// `None` covers both "no such instruction" and "message had no instruction list".
pub fn locate_instruction<'a>(
    instructions: Option<&'a [RawInstruction]>,
    account_keys: &[String],
    program_id: &str,
) -> Option<&'a RawInstruction> {
    instructions?.iter().find(|ix| {
        !ix.data.is_empty()
            && account_keys
                .get(ix.program_id_index)
                .is_some_and(|key| key == program_id)
    })
}

/// Resolve the account at `offset` of an instruction's account list through the key table.
pub fn account_at<'a>(
    account_keys: &'a [String],
    indices: &[usize],
    offset: usize,
) -> Result<&'a str, Error> {
    let idx = indices
        .get(offset)
        .ok_or_else(|| Error::MalformedInstruction {
            reason: format!(
                "account offset {offset} missing from {}-entry account list",
                indices.len()
            ),
        })?;
    account_keys
        .get(*idx)
        .map(String::as_str)
        .ok_or_else(|| Error::MalformedInstruction {
            reason: format!(
                "account index {idx} at offset {offset} out of bounds for {} keys",
                account_keys.len()
            ),
        })
}

/// Parse `value` as a pubkey and render it back in canonical base58.
pub fn wrap_address(offset: usize, value: &str) -> Result<String, Error> {
    Pubkey::from_str(value)
        .map(|key| key.to_string())
        .map_err(|_| Error::AddressWrap {
            offset,
            value: value.to_string(),
        })
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn ix(program_id_index: usize, data: &[u8]) -> RawInstruction {
        RawInstruction {
            program_id_index,
            accounts: Some(vec![0, 1]),
            data: data.to_vec(),
        }
    }

    #[test]
    fn locate_skips_other_programs_and_empty_payloads() {
        let account_keys = keys(&["user", "compute_budget", RAYDIUM_AMM_V4_PROGRAM_ID]);
        let instructions = vec![ix(1, &[2, 0]), ix(2, &[]), ix(2, &[1, 9])];

        let found = locate_instruction(
            Some(&instructions),
            &account_keys,
            RAYDIUM_AMM_V4_PROGRAM_ID,
        )
        .unwrap();
        assert_eq!(found.data, vec![1, 9]);
    }

    #[test]
    fn locate_returns_first_match_only() {
        let account_keys = keys(&[RAYDIUM_AMM_V4_PROGRAM_ID]);
        let instructions = vec![ix(0, &[1]), ix(0, &[2])];

        let found = locate_instruction(
            Some(&instructions),
            &account_keys,
            RAYDIUM_AMM_V4_PROGRAM_ID,
        )
        .unwrap();
        assert_eq!(found.data, vec![1]);
    }

    #[test]
    fn locate_not_found_cases() {
        let account_keys = keys(&["a", RAYDIUM_AMM_V4_PROGRAM_ID]);

        assert!(locate_instruction(None, &account_keys, RAYDIUM_AMM_V4_PROGRAM_ID).is_none());
        assert!(
            locate_instruction(Some(&[]), &account_keys, RAYDIUM_AMM_V4_PROGRAM_ID).is_none()
        );

        let only_other = vec![ix(0, &[1])];
        assert!(
            locate_instruction(Some(&only_other), &account_keys, RAYDIUM_AMM_V4_PROGRAM_ID)
                .is_none()
        );

        let dangling_program = vec![ix(7, &[1])];
        assert!(
            locate_instruction(
                Some(&dangling_program),
                &account_keys,
                RAYDIUM_AMM_V4_PROGRAM_ID
            )
            .is_none()
        );
    }

    #[test]
    fn account_at_reports_missing_offset_and_dangling_index() {
        let account_keys = keys(&["a", "b"]);

        assert_eq!(account_at(&account_keys, &[1, 0], 1).unwrap(), "a");
        assert!(matches!(
            account_at(&account_keys, &[1], 1),
            Err(Error::MalformedInstruction { .. })
        ));
        assert!(matches!(
            account_at(&account_keys, &[5], 0),
            Err(Error::MalformedInstruction { .. })
        ));
    }

    #[test]
    fn wrap_address_accepts_pubkeys_and_rejects_garbage() {
        assert_eq!(wrap_address(8, WSOL_MINT).unwrap(), WSOL_MINT);

        let Err(Error::AddressWrap { offset, value }) = wrap_address(4, "not-a-key") else {
            panic!("expected AddressWrap");
        };
        assert_eq!(offset, 4);
        assert_eq!(value, "not-a-key");
    }
}
