use {
  super::*,
  bitcoin::{
    opcodes::all::{OP_CHECKSIGVERIFY, OP_DROP, OP_PUSHNUM_1},
    PublicKey,
  },
};

/// What a link needs from the link before it. Holding the transaction by
/// value keeps the chain a plain sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorLinkHandle {
  pub txid: Txid,
  pub transaction: Transaction,
  pub redeem_script: ScriptBuf,
  pub partial: Vec<Chunk>,
}

impl PriorLinkHandle {
  pub(crate) fn new(transaction: Transaction, redeem_script: ScriptBuf, partial: Vec<Chunk>) -> Self {
    Self {
      txid: transaction.txid(),
      transaction,
      redeem_script,
      partial,
    }
  }

  pub fn outpoint(&self) -> OutPoint {
    OutPoint {
      txid: self.txid,
      vout: 0,
    }
  }

  pub fn value(&self) -> Amount {
    Amount::from_sat(
      self
        .transaction
        .output
        .first()
        .map(|output| output.value)
        .unwrap_or_default(),
    )
  }

  pub fn serialized(&self) -> Vec<u8> {
    consensus::serialize(&self.transaction)
  }
}

/// `<pubkey> CHECKSIGVERIFY DROP… TRUE`, with one DROP per chunk the
/// spender replays in front of the signature.
pub fn lock_script(public_key: &PublicKey, drops: usize) -> ScriptBuf {
  let mut chunks = Vec::with_capacity(drops + 3);
  chunks.push(Chunk::push(public_key.to_bytes()));
  chunks.push(Chunk::opcode(OP_CHECKSIGVERIFY.to_u8()));
  chunks.extend((0..drops).map(|_| Chunk::opcode(OP_DROP.to_u8())));
  chunks.push(Chunk::opcode(OP_PUSHNUM_1.to_u8()));
  ScriptBuf::from_bytes(Chunk::compile(&chunks))
}

pub fn p2sh_output(lock: &Script, value: Amount) -> TxOut {
  TxOut {
    value: value.to_sat(),
    script_pubkey: ScriptBuf::new_p2sh(&lock.script_hash()),
  }
}

/// The prior partial, then the signature, then the prior lock script.
pub fn unlock_script(prior: &PriorLinkHandle, signature: Vec<u8>) -> ScriptBuf {
  let mut chunks = prior.partial.clone();
  chunks.push(Chunk::push(signature));
  chunks.push(Chunk::push(prior.redeem_script.to_bytes()));
  ScriptBuf::from_bytes(Chunk::compile(&chunks))
}

#[derive(Clone, Copy)]
pub(crate) enum LinkInputs<'a> {
  Funding(&'a [Utxo]),
  Prior(&'a PriorLinkHandle),
}

/// Builds, signs and finalizes one transaction of the chain.
pub(crate) fn assemble(
  signer: &Signer,
  inputs: LinkInputs,
  output: Vec<TxOut>,
) -> Result<Transaction, Error> {
  let previous_outputs = match inputs {
    LinkInputs::Funding(utxos) => utxos.iter().map(Utxo::outpoint).collect(),
    LinkInputs::Prior(prior) => vec![prior.outpoint()],
  };

  let mut tx = Transaction {
    version: TRANSACTION_VERSION,
    lock_time: LockTime::ZERO,
    input: previous_outputs
      .into_iter()
      .map(|previous_output| TxIn {
        previous_output,
        script_sig: ScriptBuf::new(),
        sequence: Sequence::MAX,
        witness: Witness::new(),
      })
      .collect(),
    output,
  };

  let sign = |tx: &Transaction, input: usize, script_code: &Script| {
    signer
      .sign(tx, input, script_code)
      .map_err(|err| Error::MalformedChainState(format!("{err:#}")))
  };

  match inputs {
    LinkInputs::Funding(utxos) => {
      let funding_script = signer.script_pubkey();

      let mut script_sigs = Vec::with_capacity(utxos.len());
      for (input, utxo) in utxos.iter().enumerate() {
        let script_pubkey = utxo.script_pubkey(signer);
        if script_pubkey != funding_script {
          return Err(Error::UnspendableFunding(utxo.outpoint()));
        }
        script_sigs.push(signer.p2pkh_unlock_script(sign(&tx, input, &script_pubkey)?));
      }

      for (input, script_sig) in tx.input.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
      }
    }
    LinkInputs::Prior(prior) => {
      let signature = sign(&tx, 0, &prior.redeem_script)?;
      tx.input[0].script_sig = unlock_script(prior, signature);
    }
  }

  Ok(tx)
}
