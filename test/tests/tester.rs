use isagen_test::test::{Parser, Runner, Test};

#[test]
fn parse() -> Result<(), String> {
    let src = "# comment

        1000: 01448533    add rd=10 rs1=9 rs2=20 imm=0   # trailing note
              fff00513    addi rd=10 rs1=0 rs2=0 imm=-1
        2000: 0000 0000   two halves
              00000073
    ";

    let mut parser = Parser::new("input", src);
    let mut test = Test::default();

    assert!(parser.parse(&mut test)?);
    assert_eq!(test.line, 3);
    assert_eq!(test.address, 0x1000);
    assert_eq!(test.bytes, &[0x33, 0x85, 0x44, 0x01]);
    assert_eq!(test.words().collect::<Vec<_>>(), [0x0144_8533]);
    assert_eq!(test.expect, "add rd=10 rs1=9 rs2=20 imm=0");

    assert!(parser.parse(&mut test)?);
    assert_eq!(test.line, 4);
    assert_eq!(test.address, 0x1004);
    assert_eq!(test.expect, "addi rd=10 rs1=0 rs2=0 imm=-1");

    assert!(parser.parse(&mut test)?);
    assert_eq!(test.address, 0x2000);
    assert_eq!(test.bytes, &[0, 0, 0, 0]);
    assert_eq!(test.expect, "two halves");

    assert!(parser.parse(&mut test)?);
    assert_eq!(test.address, 0x2004);
    assert_eq!(test.expect, "");

    assert!(!parser.parse(&mut test)?);
    Ok(())
}

#[test]
fn parse_errors() {
    let mut test = Test::default();
    let err = Parser::new("bad", "zz: 00000013  nop").parse(&mut test).unwrap_err();
    assert!(err.contains("invalid address"), "{err}");
    assert!(err.ends_with("bad:1"), "{err}");

    let err = Parser::new("bad", "\n 0013f  nop").parse(&mut test).unwrap_err();
    assert!(err.contains("invalid instruction word"), "{err}");
    assert!(err.ends_with("bad:2"), "{err}");
}

struct Words;

impl Runner for Words {
    fn decode(&mut self, test: &Test) -> Option<String> {
        let word = test.words().next()?;
        (word != 0).then(|| format!("word  {word:#x}"))
    }
}

#[test]
fn runner() {
    assert_eq!(
        Words.run("mismatch", "00000013  word 0x13\n00000073  word 0x74"),
        Err("failed 1 of 2 tests".into())
    );
    assert_eq!(Words.run("ok", "00000013  word 0x13\n00000073  word 0x73"), Ok(()));
    assert!(Words.run("zero", "00000000  word 0x0").is_err());
}
